// src/editor/prompts.rs
//! Prompt templates. Each returns a self-contained instruction string.

use crate::ingest::types::Candidate;

fn capped(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub fn relevance(c: &Candidate) -> String {
    format!(
        r#"You are the editor-in-chief of a crypto news outlet. Rate how important this news item is for the main social channels.

NEWS
Title: {title}
Summary: {summary}
Detected category: {category}

SCORING (1-10)
- 9-10: listing of a major coin (top 50), strategic partnership, major regulatory change, significant hack
- 7-8: listing of a smaller coin with potential, important exchange product update, relevant market move
- 5-6: new trading pairs, minor technical updates, delistings
- 1-4: maintenance, routine margin/futures updates, administrative changes

KEY RULE: "Will Add X on Earn, Buy Crypto, Convert" items are ROUTINE (4-5). Only "Will LIST" of new coins is important (7+).

Answer ONLY with JSON, no markdown:
{{"score": N, "reason": "short reason", "category": "listing|partnership|regulatory|technical|minor"}}"#,
        title = c.title,
        summary = if c.summary.is_empty() { "N/A" } else { c.summary.as_str() },
        category = c.category,
    )
}

pub fn telegram(c: &Candidate) -> String {
    format!(
        r#"You are the lead crypto intelligence analyst for a premium Telegram channel. The audience is investors, traders and builders who want actionable analysis, not clickbait.

SOURCE
Title: {title}
Summary: {summary}
Full text: {body}
Original URL: {url}

Write a professional Telegram post using Telegram HTML only (<b>, <i>, <code>; no Markdown):
🚨 <b>BREAKING: [reworded headline]</b>

📊 <b>The announcement:</b>
[what was announced, 1-2 short paragraphs]

🧠 <b>Analysis:</b>
[why it matters for the ecosystem or the token]

🎯 <b>Verdict:</b> [Bullish, Bearish, Caution or Structural]

🐺 Wolfsfera Intelligence

RULES
1. At most 950 characters in total.
2. Institutional tone, no hype.
3. Do not invent figures or dates that are not in the source.

Reply ONLY with the HTML of the message."#,
        title = c.title,
        summary = c.summary,
        body = c.body_or_summary(),
        url = c.source_url,
    )
}

pub fn x_thread(c: &Candidate, stub_url: &str) -> String {
    format!(
        r#"You are the lead analyst of a crypto intelligence account on X. Write an analytical thread of 3 to 5 tweets about this news.

SOURCE
Title: {title}
Key content: {summary}
Body: {body}

STRUCTURE
1. Analytical hook, no shouting caps, ends inviting the reader into the thread 🧵👇
2. Hard data: dates, pairs, conditions, amounts.
3. Why it matters and which market narrative it feeds.
4. Closing with this exact link at the end: {stub_url}

RULES
- Each tweet at most 280 characters.
- Never write the word "THREAD".
- One or two hashtags, only in the first or last tweet.

Reply ONLY with a JSON array of strings:
["tweet 1", "tweet 2", ...]"#,
        title = c.title,
        summary = c.summary,
        body = c.full_body.as_deref().map(|b| capped(b, 3000)).unwrap_or_default(),
    )
}

pub fn linkedin(c: &Candidate, stub_url: &str) -> String {
    format!(
        r#"You are a senior analyst of digital markets and blockchain writing for a professional LinkedIn audience.

SOURCE
Title: {title}
Summary: {summary}
Full text: {body}
Original URL: {url}

Write a 150-200 word LinkedIn post with a strategic angle:
- Opening line that hooks professionals
- Context: what happened and why it matters
- Implications for the market, institutional adoption or regulation
- What it could mean in the medium term
- Call to action pointing to {stub_url}

RULES
- Professional tone, at most 2-3 emojis.
- Hashtags only at the end: #Blockchain #Crypto plus 2-3 relevant ones.
- No crypto-twitter slang.

Reply ONLY with the post text."#,
        title = c.title,
        summary = c.summary,
        body = capped(c.body_or_summary(), 2000),
        url = c.source_url,
    )
}
