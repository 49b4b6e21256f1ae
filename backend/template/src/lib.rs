//! Reply template renderer.
//!
//! Templates are literal text interspersed with `[[token]]` placeholders.
//! Zero-argument tokens resolve to interaction context; parameterized tokens
//! (`name:payload`) cover random values, time, a restricted arithmetic
//! evaluator, string transforms and a ternary conditional. Unknown tokens
//! are left verbatim so a typo stays visible instead of failing the reply.
//!
//! Expansion runs in fixed-point passes bounded by [`MAX_PASSES`], and token
//! payloads recurse at most [`MAX_DEPTH`] levels, so termination holds for
//! any input.

mod math;

use std::fmt::Write as _;

use chrono::{FixedOffset, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use math::eval as eval_math;

/// Maximum fixed-point expansion passes over the whole template.
pub const MAX_PASSES: usize = 4;
/// Maximum recursion depth for nested parameterized payloads.
pub const MAX_DEPTH: usize = 3;

const DEFAULT_AVATAR: &str = "https://cdn.discordapp.com/embed/avatars/0.png";

static TZ_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i):(utc|[+-]\d{1,2}(?::\d{2})?)$").unwrap());

/// Interaction context a template renders against.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    /// Avatar hash, turned into a CDN URL; absent falls back to the default
    /// embed avatar.
    pub avatar_hash: Option<String>,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
    pub locale: String,
    pub command_name: String,
}

impl RenderContext {
    fn mention(&self) -> String {
        if self.user_id.is_empty() {
            return self.username.clone();
        }
        format!("<@{}>", self.user_id)
    }

    fn avatar_url(&self) -> String {
        match self.avatar_hash.as_deref() {
            Some(hash) if !self.user_id.is_empty() => {
                format!("https://cdn.discordapp.com/avatars/{}/{hash}.png", self.user_id)
            }
            _ => DEFAULT_AVATAR.to_string(),
        }
    }

    fn locale_lang(&self) -> &str {
        self.locale.split('-').next().unwrap_or("")
    }

    fn locale_region(&self) -> &str {
        self.locale.split_once('-').map(|(_, region)| region).unwrap_or("")
    }
}

/// Render a template against a context. The caller is responsible for the
/// final platform length cap.
pub fn render(template: &str, ctx: &RenderContext) -> String {
    let mut current = template.to_string();
    for _ in 0..MAX_PASSES {
        let next = expand(&current, ctx, 0);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// One expansion pass: replace every resolvable `[[token]]` in `input`.
fn expand(input: &str, ctx: &RenderContext, depth: usize) -> String {
    if depth > MAX_DEPTH {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find("[[") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        match find_close(after_open) {
            Some(close) => {
                let inner = &after_open[..close];
                match resolve_token(inner, ctx, depth) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("[[");
                        out.push_str(inner);
                        out.push_str("]]");
                    }
                }
                rest = &after_open[close + 2..];
            }
            None => {
                // Unbalanced opener, emit as-is.
                out.push_str("[[");
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Byte offset of the `]]` matching an already-consumed `[[`, accounting for
/// nested openers.
fn find_close(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut nesting = 1usize;
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'[' && bytes[i + 1] == b'[' {
            nesting += 1;
            i += 2;
        } else if bytes[i] == b']' && bytes[i + 1] == b']' {
            nesting -= 1;
            if nesting == 0 {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

/// Resolve one token body. `None` keeps the token verbatim.
fn resolve_token(inner: &str, ctx: &RenderContext, depth: usize) -> Option<String> {
    if let Some(value) = resolve_context_token(inner, ctx) {
        return Some(value);
    }

    let (name, payload) = inner.split_once(':')?;
    if name == "if" {
        return resolve_conditional(payload, ctx, depth);
    }

    let payload = expand(payload, ctx, depth + 1);
    match name {
        "random" => resolve_random(&payload),
        "rand.pick" => Some(pick(&payload)),
        "rand.weighted" => Some(weighted_pick(&payload)),
        "time.format" => resolve_time_format(&payload),
        "math" => Some(eval_math(&payload).map(math::format_number).unwrap_or_default()),
        "upper" => Some(payload.to_uppercase()),
        "lower" => Some(payload.to_lowercase()),
        "title" => Some(title_case(&payload)),
        "truncate" => {
            let (len, text) = payload.split_once(':')?;
            let len: usize = len.trim().parse().ok()?;
            Some(text.chars().take(len).collect())
        }
        "slice" => {
            let (start, rest) = payload.split_once(':')?;
            let (end, text) = rest.split_once(':')?;
            Some(slice(text, start.trim(), end.trim())?)
        }
        "url.encode" => Some(urlencoding::encode(&payload).into_owned()),
        "url.decode" => Some(
            urlencoding::decode(&payload)
                .map(|decoded| decoded.into_owned())
                .unwrap_or(payload),
        ),
        "role" => (!payload.is_empty()).then(|| format!("<@&{payload}>")),
        "channel" => (!payload.is_empty()).then(|| format!("<#{payload}>")),
        _ => None,
    }
}

fn resolve_context_token(inner: &str, ctx: &RenderContext) -> Option<String> {
    let value = match inner {
        "user" => ctx.mention(),
        "user.id" => ctx.user_id.clone(),
        "user.name" => ctx.username.clone(),
        "user.nick" => ctx.display_name.clone().unwrap_or_else(|| ctx.username.clone()),
        "user.avatar" => ctx.avatar_url(),
        "channel" => ctx
            .channel_id
            .as_deref()
            .map(|id| format!("<#{id}>"))
            .unwrap_or_default(),
        "server.id" => ctx.guild_id.clone().unwrap_or_default(),
        "locale" => ctx.locale.clone(),
        "locale.lang" => ctx.locale_lang().to_string(),
        "locale.region" => ctx.locale_region().to_string(),
        "command" => ctx.command_name.clone(),
        "uuid" => uuid::Uuid::new_v4().to_string(),
        "random" => rand::thread_rng().gen_range(0..=100).to_string(),
        "time" => Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        "time.unix" => Utc::now().timestamp().to_string(),
        "time.tag" => format!("<t:{}:F>", Utc::now().timestamp()),
        "time.relative" => format!("<t:{}:R>", Utc::now().timestamp()),
        _ => return None,
    };
    Some(value)
}

/// `random:max` or `random:min:max`, inclusive; swapped bounds are tolerated.
fn resolve_random(payload: &str) -> Option<String> {
    let (min, max) = match payload.split_once(':') {
        Some((min, max)) => (min.trim().parse::<i64>().ok()?, max.trim().parse::<i64>().ok()?),
        None => (0, payload.trim().parse::<i64>().ok()?),
    };
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    Some(rand::thread_rng().gen_range(low..=high).to_string())
}

fn pick(payload: &str) -> String {
    let choices: Vec<&str> = payload.split(',').map(str::trim).filter(|c| !c.is_empty()).collect();
    if choices.is_empty() {
        return String::new();
    }
    choices[rand::thread_rng().gen_range(0..choices.len())].to_string()
}

/// `rand.weighted:a=1,b=3`. A non-numeric or non-positive weight counts
/// as 1.
fn weighted_pick(payload: &str) -> String {
    let entries: Vec<(String, f64)> = payload
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((choice, weight)) => {
                let weight = weight.trim().parse::<f64>().ok().filter(|w| *w > 0.0).unwrap_or(1.0);
                (choice.trim().to_string(), weight)
            }
            None => (entry.to_string(), 1.0),
        })
        .collect();
    if entries.is_empty() {
        return String::new();
    }
    let total: f64 = entries.iter().map(|(_, weight)| weight).sum();
    let mut roll = rand::thread_rng().gen_range(0.0..total);
    for (choice, weight) in &entries {
        if roll < *weight {
            return choice.clone();
        }
        roll -= weight;
    }
    entries.last().map(|(choice, _)| choice.clone()).unwrap_or_default()
}

/// `time.format:<strftime>[:tz]` with tz `utc` or a `±HH[:MM]` offset.
fn resolve_time_format(payload: &str) -> Option<String> {
    let (pattern, offset) = match TZ_SUFFIX.captures(payload) {
        Some(caps) => {
            let full = caps.get(0)?;
            let offset = parse_offset(caps.get(1)?.as_str())?;
            (&payload[..full.start()], offset)
        }
        None => (payload, FixedOffset::east_opt(0)?),
    };
    let now = Utc::now().with_timezone(&offset);
    let mut out = String::new();
    // An invalid strftime specifier surfaces as a fmt error; swallow it into
    // an empty result rather than panicking mid-render.
    if write!(out, "{}", now.format(pattern)).is_err() {
        return Some(String::new());
    }
    Some(out)
}

fn parse_offset(tz: &str) -> Option<FixedOffset> {
    if tz.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let sign: i32 = if tz.starts_with('-') { -1 } else { 1 };
    let body = &tz[1..];
    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None => (body.parse::<i32>().ok()?, 0),
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// `if:<cond>?<true>:<false>`. The condition is itself a sub-template.
fn resolve_conditional(payload: &str, ctx: &RenderContext, depth: usize) -> Option<String> {
    let (condition, branches) = payload.split_once('?')?;
    let (when_true, when_false) = branches.split_once(':').unwrap_or((branches, ""));
    let resolved = expand(condition, ctx, depth + 1);
    let branch = if is_truthy(&resolved) { when_true } else { when_false };
    Some(expand(branch, ctx, depth + 1))
}

/// Everything is true except a small fixed falsy set; an unresolved token is
/// non-empty text and therefore true.
fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off" | "nil" | "null" | "undefined"
    )
}

fn title_case(input: &str) -> String {
    input
        .split_inclusive(char::is_whitespace)
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect()
}

fn slice(text: &str, start: &str, end: &str) -> Option<String> {
    let len = text.chars().count();
    let clamp = |raw: &str| -> Option<usize> {
        let value: i64 = raw.parse().ok()?;
        Some(value.max(0).min(len as i64) as usize)
    };
    let start = clamp(start)?;
    let end = clamp(end)?;
    if start >= end {
        return Some(String::new());
    }
    Some(text.chars().skip(start).take(end - start).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext {
        RenderContext {
            user_id: "123".into(),
            username: "alex".into(),
            display_name: Some("Alex".into()),
            avatar_hash: Some("abc".into()),
            channel_id: Some("456".into()),
            guild_id: Some("789".into()),
            locale: "en-US".into(),
            command_name: "greet".into(),
        }
    }

    #[test]
    fn resolves_context_tokens() {
        let ctx = ctx();
        assert_eq!(render("[[user.name]]", &ctx), "alex");
        assert_eq!(render("[[user]]", &ctx), "<@123>");
        assert_eq!(render("[[user.nick]]", &ctx), "Alex");
        assert_eq!(render("[[channel]]", &ctx), "<#456>");
        assert_eq!(render("[[server.id]]", &ctx), "789");
        assert_eq!(render("[[command]]", &ctx), "greet");
        assert_eq!(
            render("[[user.avatar]]", &ctx),
            "https://cdn.discordapp.com/avatars/123/abc.png"
        );
    }

    #[test]
    fn locale_parts_split() {
        let ctx = ctx();
        assert_eq!(render("[[locale]] [[locale.lang]] [[locale.region]]", &ctx), "en-US en US");
    }

    #[test]
    fn missing_avatar_falls_back_to_default() {
        let mut ctx = ctx();
        ctx.avatar_hash = None;
        assert_eq!(render("[[user.avatar]]", &ctx), DEFAULT_AVATAR);
    }

    #[test]
    fn unknown_tokens_stay_verbatim() {
        let ctx = ctx();
        assert_eq!(render("[[missing.token]]", &ctx), "[[missing.token]]");
        assert_eq!(render("hi [[foo:bar]]", &ctx), "hi [[foo:bar]]");
    }

    #[test]
    fn unbalanced_brackets_pass_through() {
        let ctx = ctx();
        assert_eq!(render("open [[user.name", &ctx), "open [[user.name");
        assert_eq!(render("stray ]] here", &ctx), "stray ]] here");
    }

    #[test]
    fn random_respects_bounds() {
        let ctx = ctx();
        for _ in 0..50 {
            let value: i64 = render("[[random:3:5]]", &ctx).parse().unwrap();
            assert!((3..=5).contains(&value));
        }
        // Swapped bounds are tolerated.
        let value: i64 = render("[[random:5:3]]", &ctx).parse().unwrap();
        assert!((3..=5).contains(&value));
        assert_eq!(render("[[random:1:1]]", &ctx), "1");
        assert_eq!(render("[[random:abc]]", &ctx), "[[random:abc]]");
    }

    #[test]
    fn rand_pick_chooses_a_listed_entry() {
        let ctx = ctx();
        for _ in 0..20 {
            let choice = render("[[rand.pick:a, b ,c]]", &ctx);
            assert!(["a", "b", "c"].contains(&choice.as_str()));
        }
        assert_eq!(render("[[rand.pick:]]", &ctx), "");
    }

    #[test]
    fn weighted_pick_honors_entries_and_bad_weights() {
        let ctx = ctx();
        assert_eq!(render("[[rand.weighted:only=3]]", &ctx), "only");
        for _ in 0..20 {
            let choice = render("[[rand.weighted:a=1,b=junk]]", &ctx);
            assert!(["a", "b"].contains(&choice.as_str()));
        }
    }

    #[test]
    fn math_token_evaluates_or_collapses() {
        let ctx = ctx();
        assert_eq!(render("[[math:2+2*3]]", &ctx), "8");
        assert_eq!(render("[[math:alert(1)]]", &ctx), "");
        assert_eq!(render("[[math:min(4, 2)^2]]", &ctx), "4");
    }

    #[test]
    fn string_transforms() {
        let ctx = ctx();
        assert_eq!(render("[[upper:hey]]", &ctx), "HEY");
        assert_eq!(render("[[lower:HEY]]", &ctx), "hey");
        assert_eq!(render("[[title:hello wide world]]", &ctx), "Hello Wide World");
        assert_eq!(render("[[truncate:3:abcdef]]", &ctx), "abc");
        assert_eq!(render("[[slice:1:3:abcdef]]", &ctx), "bc");
        assert_eq!(render("[[slice:-2:3:abcdef]]", &ctx), "abc");
        assert_eq!(render("[[slice:4:2:abcdef]]", &ctx), "");
    }

    #[test]
    fn url_tokens_round_trip() {
        let ctx = ctx();
        assert_eq!(render("[[url.encode:a b]]", &ctx), "a%20b");
        assert_eq!(render("[[url.decode:a%20b]]", &ctx), "a b");
    }

    #[test]
    fn mention_formatting_tokens() {
        let ctx = ctx();
        assert_eq!(render("[[role:99]]", &ctx), "<@&99>");
        assert_eq!(render("[[channel:42]]", &ctx), "<#42>");
    }

    #[test]
    fn transforms_apply_to_nested_tokens() {
        let ctx = ctx();
        assert_eq!(render("[[upper:[[user.name]]]]", &ctx), "ALEX");
    }

    #[test]
    fn conditional_follows_truthiness() {
        let ctx = ctx();
        assert_eq!(render("[[if:[[random:1:1]]?yes:no]]", &ctx), "yes");
        assert_eq!(render("[[if:0?yes:no]]", &ctx), "no");
        assert_eq!(render("[[if:off?yes:no]]", &ctx), "no");
        assert_eq!(render("[[if:anything?yes:no]]", &ctx), "yes");
        // Unresolved tokens in the condition count as truthy text.
        assert_eq!(render("[[if:[[nope]]?yes:no]]", &ctx), "yes");
    }

    #[test]
    fn conditional_branches_expand() {
        let ctx = ctx();
        assert_eq!(render("[[if:1?[[user.name]]:nobody]]", &ctx), "alex");
    }

    #[test]
    fn time_tokens_have_expected_shape() {
        let ctx = ctx();
        assert!(render("[[time.unix]]", &ctx).parse::<i64>().is_ok());
        assert!(render("[[time.tag]]", &ctx).starts_with("<t:"));
        assert!(render("[[time.relative]]", &ctx).ends_with(":R>"));
        let year = render("[[time.format:%Y]]", &ctx);
        assert_eq!(year.len(), 4);
        let utc_year = render("[[time.format:%Y:utc]]", &ctx);
        assert_eq!(year, utc_year);
    }

    #[test]
    fn expansion_terminates_on_self_producing_input() {
        let ctx = ctx();
        // Each pass peels one bracket layer; the pass bound stops the rest.
        let pathological = "[[".repeat(40) + &"]]".repeat(40);
        let _ = render(&pathological, &ctx);
    }

    #[test]
    fn uuid_token_is_well_formed() {
        let ctx = ctx();
        let value = render("[[uuid]]", &ctx);
        assert_eq!(value.len(), 36);
        assert_eq!(value.matches('-').count(), 4);
    }
}
