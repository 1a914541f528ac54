/// Question bank loaded from disk at startup.
pub mod question_bank;
