//! services/api/src/adapters/assistant_llm.rs
//!
//! This module contains the adapter for the dashboard's chat assistant.
//! It implements the `GoalAssistant` port from the `core` crate against any
//! OpenAI-compatible chat-completions endpoint (Groq in production).

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are an intelligent and encouraging AI productivity assistant integrated within the "Goal Command Centre" dashboard. Your primary purpose is to help the user stay informed, motivated, and on track with the goals they have set.

Core Instructions:
1. Analyze User Queries: Carefully read the user's question to understand their intent. They may be asking for a summary, specific details, or advice on what to do next.
2. Provide Accurate Information: Base your answers strictly on the USER GOALS DATA provided below. If asked about a goal, retrieve its title, target, action steps, and current streak.
3. Be encouraging: Use the daily_streak data to offer motivation. If a streak is high, congratulate them. If it's low or zero, gently encourage them to get started today.
4. Suggest Next Steps: When a user asks "What should I do next?" analyze their incomplete_tasks and suggest one as a clear, actionable next step.
5. Maintain a Conversational Tone: Be helpful and approachable. Address the user directly.
6. Handle Ambiguity: If the user's query is unclear, ask for clarification.
7. Stay Within Scope: If the user asks a question that cannot be answered using the provided data (e.g., "What's the weather like?" or "Give me financial advice"), gently decline and guide them back to their goals.

USER GOALS DATA:
{goals_context}

Remember to:
- Be concise but warm in your responses
- Focus on actionable insights
- Celebrate wins and encourage consistency
- Keep responses under 200 words when possible"#;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    error::OpenAIError,
    Client,
};
use async_trait::async_trait;
use command_centre_core::domain::GoalContext;
use command_centre_core::ports::{GoalAssistant, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GoalAssistant` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGoalAssistant {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGoalAssistant {
    /// Creates a new `OpenAiGoalAssistant`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Renders the system prompt with the serialized goal snapshot. Pure,
    /// so the prompt shape is testable without a network.
    fn system_prompt(context: &[GoalContext]) -> PortResult<String> {
        let goals_json = serde_json::to_string_pretty(context)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(SYSTEM_PROMPT_TEMPLATE.replace("{goals_context}", &goals_json))
    }
}

//=========================================================================================
// `GoalAssistant` Trait Implementation
//=========================================================================================

#[async_trait]
impl GoalAssistant for OpenAiGoalAssistant {
    /// Answers a natural-language question against the user's goal snapshot.
    async fn answer(&self, message: &str, context: &[GoalContext]) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(Self::system_prompt(context)?)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(message)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.7)
            .max_completion_tokens(500u32)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which
        // respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(PortError::Unexpected(
                    "Assistant LLM response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(PortError::Unexpected(
                "Assistant LLM returned no choices in its response.".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_centre_core::domain::StepContext;

    #[test]
    fn system_prompt_embeds_the_goal_snapshot() {
        let context = vec![GoalContext {
            title: "Daily Exercise".into(),
            description: Some("30 minutes a day".into()),
            target_date: Some("2025-12-31".parse().unwrap()),
            action_steps: vec![StepContext { title: "Morning jog".into(), completed: true }],
            daily_streak: 4,
            completed_dates: vec!["2025-01-21".parse().unwrap()],
            incomplete_tasks: vec![],
        }];

        let prompt = OpenAiGoalAssistant::system_prompt(&context).unwrap();
        assert!(prompt.contains("USER GOALS DATA:"));
        assert!(prompt.contains("\"title\": \"Daily Exercise\""));
        assert!(prompt.contains("\"daily_streak\": 4"));
        assert!(!prompt.contains("{goals_context}"));
    }

    #[test]
    fn system_prompt_with_no_goals_is_still_well_formed() {
        let prompt = OpenAiGoalAssistant::system_prompt(&[]).unwrap();
        assert!(prompt.contains("USER GOALS DATA:\n[]"));
    }
}
