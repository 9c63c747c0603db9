//! Instructions sent to the providers.

pub const CHAT_SYSTEM_PROMPT: &str =
    "You are a helpful coding assistant named OmniAssist. You maintain the context of the conversation.";

/// Single user turn for providers that take the history as flat text
pub fn chat_blob_prompt(history_blob: &str, message: &str) -> String {
    format!(
        "Past Conversation:\n{}\n\nUser Message:\n{}\n\nOmniAssist Response:",
        history_blob, message
    )
}

pub fn code_system_prompt() -> String {
    let example = serde_json::json!({
        "generatedCode": "Your generated code here...",
        "explanation": "A brief explanation of the code."
    });
    let example = serde_json::to_string_pretty(&example).unwrap_or_default();
    format!(
        "You are an expert software developer.\n\
         You will generate code based on the provided task description and programming language.\n\
         Your response MUST be a valid JSON object. Ensure your output strictly adheres to the following JSON structure:\n\
         ```json\n{}\n```\n\
         If you cannot fulfill the request or it's unclear, respond with an error message within the JSON structure's \"explanation\" field and empty \"generatedCode\".",
        example
    )
}

pub fn code_user_prompt(task_description: &str, language: &str) -> String {
    format!(
        "Task Description: {}\nProgramming Language: {}",
        task_description, language
    )
}
