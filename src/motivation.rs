//! Quote corpus for motivation mode

/// Class of the injected quote container; at most one exists per page
pub const QUOTE_CLASS: &str = "social-sentry-quote";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub text: &'static str,
    pub author: &'static str,
}

const fn quote(text: &'static str, author: &'static str) -> Quote {
    Quote { text, author }
}

pub static QUOTES: [Quote; 11] = [
    quote("The expert in anything was once a beginner.", "Helen Hayes"),
    quote("The only way to do great work is to love what you do.", "Steve Jobs"),
    quote(
        "Education is the key to unlocking the world, a passport to freedom.",
        "Oprah Winfrey",
    ),
    quote(
        "The beautiful thing about learning is that no one can take it away from you.",
        "B.B. King",
    ),
    quote(
        "Learning is not attained by chance, it must be sought for with ardor and diligence.",
        "Abigail Adams",
    ),
    quote("Strive for progress, not perfection.", "Unknown"),
    quote(
        "The future belongs to those who believe in the beauty of their dreams.",
        "Eleanor Roosevelt",
    ),
    quote("The best way to predict the future is to create it.", "Peter Drucker"),
    quote("Believe you can and you're halfway there.", "Theodore Roosevelt"),
    quote(
        "Success is not final, failure is not fatal: It is the courage to continue that counts.",
        "Winston Churchill",
    ),
    quote("The mind is everything. What you think you become.", "Buddha"),
];

/// Pick a quote pseudo-randomly. Falls back to the first one without entropy.
pub fn pick_quote() -> &'static Quote {
    let mut seed = [0u8; 4];
    match getrandom::getrandom(&mut seed) {
        Ok(()) => &QUOTES[u32::from_le_bytes(seed) as usize % QUOTES.len()],
        Err(err) => {
            log::warn!("No entropy for quote selection: {err}");
            &QUOTES[0]
        }
    }
}
