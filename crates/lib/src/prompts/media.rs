use crate::types::MediaType;

pub const CAPTION_SYSTEM_PROMPT: &str = "You are an expert creative strategist evaluating user-generated advertising content. Provide a single concise paragraph explaining what the asset depicts, the tone, on-screen subjects, actions, and relevance for UGC marketing campaigns. Highlight any hooks or calls to action that would matter to performance marketers.";

/// The user turn that accompanies the inline media.
pub fn caption_user_prompt(media_type: MediaType) -> String {
    let intro = match media_type {
        MediaType::Image => "Analyze this user-generated image created for advertising purposes.",
        MediaType::Video => "Analyze this user-generated video created for advertising purposes.",
    };
    format!(
        "{intro} Summarize what you see in one paragraph, focusing on details that a performance marketer would care about."
    )
}
