//! Built-in prompt text and canned assistant replies

pub mod builtin {
    /// First message of every chat, also what `reset` restores
    pub const GREETING: &str =
        "Hi!\nWelcome to Baby Nutrition Assistant.\n\nHow can I help you plan your baby's food today?";

    /// System instruction for the general chat assistant
    pub const CHAT_SYSTEM: &str = "You are a knowledgeable baby nutrition assistant. Provide concise, practical advice about baby food and nutrition. Focus on safe, age-appropriate recommendations.";

    pub const CHAT_TIMEOUT: &str = "I apologize, but it's taking longer than expected to process your request. Please try asking a shorter or simpler question.";

    pub const CHAT_TRANSPORT: &str = "I apologize, but I'm having trouble connecting to the service right now. Please try again in a moment.";

    pub const PLAN_TIMEOUT: &str =
        "The plan generation took too long. Please try again with fewer requirements.";

    pub const PLAN_TRANSPORT: &str = "Failed to generate the food plan. Please try again.";

    pub const PLAN_SIGN_IN: &str = "Please sign in to save your food plan";

    pub const PLAN_SAVE_FAILED: &str = "Failed to save the food plan";
}
