use crate::types::ContextChunk;

const NO_CONTEXT: &str = "No relevant transcript context available.";

/// `M:SS`, or `H:MM:SS` from one hour on. Negative input counts as zero.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Render chunks as `[start - end]` headed blocks separated by blank lines
pub fn build_context_text(chunks: &[ContextChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT.to_string();
    }

    chunks
        .iter()
        .map(|chunk| {
            format!(
                "[{} - {}]\n{}",
                format_timestamp(chunk.start_time),
                format_timestamp(chunk.end_time),
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_system_prompt(chunks: &[ContextChunk], current_timestamp: f64, video_title: &str) -> String {
    format!(
        "You are an AI learning assistant helping a student understand video lectures, \
particularly on machine learning and technical topics.

Context from video transcript:
{context}

Current timestamp: {current_time}
Video: {video_title}

Guidelines:
- Answer the student's question using the video context provided
- Be technical but clear - explain complex concepts step by step
- If explaining code, provide examples and walk through the logic
- If explaining math, break it down into understandable parts
- Reference specific timestamps when relevant (e.g., \"As mentioned at 5:23...\")
- If the context doesn't contain enough information to answer, say so honestly
- Keep responses focused and concise while being thorough",
        context = build_context_text(chunks),
        current_time = format_timestamp(current_timestamp),
        video_title = video_title,
    )
}
