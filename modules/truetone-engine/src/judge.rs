use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;
use truetone_common::{Comment, Video};

use ai_client::traits::ChatAgent;

const SYSTEM_PROMPT: &str = "You are an AI detection assistant. Respond with only an integer \
between 0 and 100, with no other text.";

/// Completion cap for judge requests. The contract is one bare integer, so
/// anything past a few tokens is a malformed reply we would reject anyway.
pub const MAX_REPLY_TOKENS: u32 = 10;

const PROMPT_TEMPLATE: &str = "\
You are assessing whether a music video's content and audience engagement look \
human-originated or AI-generated.

Video title: {video_title}
Channel: {channel_name}

Description:
{description}

Comments (one per line):
{comments}

Rate from 0 to 100 how confident you are that this video is human-made music \
with a genuine human audience. 0 means certainly AI-generated or botted, 100 \
means certainly human. Respond with only the integer.";

/// Graduated 0-100 humanity scorer over a chat-completion backend.
///
/// The judge itself returns errors for transport failures and unparseable
/// replies; the admission filter downgrades those to rejections so one bad
/// reply never aborts a batch.
#[derive(Clone)]
pub struct HumanityJudge {
    chat: Arc<dyn ChatAgent>,
    max_comments: usize,
}

impl HumanityJudge {
    pub fn new(chat: Arc<dyn ChatAgent>, max_comments: usize) -> Self {
        Self { chat, max_comments }
    }

    pub async fn score(&self, video: &Video, comments: &[Comment]) -> Result<u8> {
        let comments_text = comments
            .iter()
            .take(self.max_comments)
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = PROMPT_TEMPLATE
            .replace("{video_title}", &video.title)
            .replace("{channel_name}", &video.channel.name)
            .replace("{description}", &video.description)
            .replace("{comments}", &comments_text);

        let reply = self
            .chat
            .chat_completion(SYSTEM_PROMPT, &prompt)
            .await
            .context("judge completion failed")?;

        let score = parse_score(&reply)?;
        debug!(video_id = %video.id, score, "Judge scored video");
        Ok(score)
    }
}

fn parse_score(reply: &str) -> Result<u8> {
    let trimmed = reply.trim();
    let score: u8 = trimmed
        .parse()
        .with_context(|| format!("judge reply is not an integer: {trimmed:?}"))?;
    if score > 100 {
        bail!("judge reply out of range: {score}");
    }
    Ok(score)
}
