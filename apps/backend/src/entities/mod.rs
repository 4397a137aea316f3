pub mod levels;
pub mod scores;

pub use levels::Entity as Levels;
pub use levels::Model as Level;
pub use scores::Entity as Scores;
pub use scores::Model as Score;
