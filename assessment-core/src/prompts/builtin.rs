//! Bundled prompt pools.

use crate::models::prompt::{AudioRef, Prompt, PromptPool};

const SENTENCES: [&str; 20] = [
    "The quick brown fox jumps over the lazy dog.",
    "Artificial intelligence is transforming the world.",
    "She sells seashells by the seashore.",
    "Technology evolves faster than we can imagine.",
    "Despite the rain, they went hiking.",
    "The sun sets beautifully over the horizon.",
    "The stars twinkle brightly in the night sky.",
    "The moon glows brightly in the dark night.",
    "The wind blows gently through the trees.",
    "The leaves rustle softly in the breeze.",
    "The birds chirp melodiously in the morning.",
    "The bees hum contentedly in the garden.",
    "The butterflies flutter gracefully in the air.",
    "The flowers bloom beautifully in the garden.",
    "The grass sways gently in the breeze.",
    "The trees sway gently in the breeze.",
    "The sky is clear and blue.",
    "The sun is shining brightly.",
    "The moon is shining brightly.",
    "The stars are shining brightly.",
];

const AUDIO_CLIP_COUNT: usize = 14;

const TOPICS: [&str; 5] = [
    "Describe your favorite holiday.",
    "Talk about a challenge you overcame.",
    "Explain your daily routine.",
    "Talk about your future goals.",
    "Describe your hometown.",
];

fn pool(prompts: Vec<Prompt>) -> PromptPool {
    // Ids are generated from distinct indices, so construction cannot fail.
    match PromptPool::new(prompts) {
        Ok(pool) => pool,
        Err(e) => unreachable!("built-in pool is invalid: {e}"),
    }
}

/// Round 1: twenty read-aloud sentences.
pub fn sentences() -> PromptPool {
    pool(
        SENTENCES
            .iter()
            .enumerate()
            .map(|(i, text)| Prompt::sentence(format!("s{}", i + 1), *text))
            .collect(),
    )
}

/// Round 2: fourteen bundled clips, `assets/audios/a1.mp3` … `a14.mp3`.
pub fn audio_clips() -> PromptPool {
    pool(
        (1..=AUDIO_CLIP_COUNT)
            .map(|n| {
                Prompt::audio_clip(
                    format!("a{n}"),
                    AudioRef::new(format!("assets/audios/a{n}.mp3")),
                )
            })
            .collect(),
    )
}

/// Round 3: five free-speech topics.
pub fn topics() -> PromptPool {
    pool(
        TOPICS
            .iter()
            .enumerate()
            .map(|(i, text)| Prompt::topic(format!("t{}", i + 1), *text))
            .collect(),
    )
}
