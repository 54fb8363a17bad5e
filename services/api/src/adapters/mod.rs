pub mod assistant_llm;
pub mod db;

pub use assistant_llm::OpenAiGoalAssistant;
pub use db::PgGoalStore;
