mod feed;
mod ids;
mod lesson;
mod result;

pub use feed::{DEFAULT_FEED_REPEAT, Feed, FeedItem, MediaLayout};
pub use ids::{FeedItemId, LessonId, LessonItemId, PairId, ParseIdError};
pub use lesson::{
    ContentError, Lesson, LessonItem, LessonItemContent, LessonItemKind, MatchPair,
    MatchingContent, NarrationContent, QuizContent,
};
pub use result::{LessonResult, ProgressSnapshot};
