//! Signal extraction from raw messages.
//!
//! Everything here is pure except the reputation lookup in [`FeatureExtractor::extract`].
//! Text that is empty, oversized or otherwise odd never fails extraction; it simply
//! produces fewer signals.

use crate::reputation::{ReputationProvider, StaticReputation};
use mshield_domain::analysis::FeatureVector;
use mshield_domain::config::ReputationConfig;
use mshield_domain::email::EmailMessage;
use regex::{Regex, RegexSet, RegexSetBuilder};
use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Only the first 256 KiB of subject plus body are scanned.
const MAX_SCAN_BYTES: usize = 256 * 1024;

const URGENCY_MARKERS: [&str; 14] = [
    r"\burgent(ly)?\b",
    r"\bverify\b",
    r"\bclick\b",
    r"\bimmediately\b",
    r"\bsuspend(ed)?\b",
    r"\bact\s+now\b",
    r"\bexpir(e|es|ed)\b",
    r"\bfinal\s+notice\b",
    r"\bwithin\s+24\s+hours\b",
    r"\baccount\s+will\s+be\b",
    r"\bunusual\s+activity\b",
    r"\baction\s+required\b",
    r"\blimited\s+time\b",
    r"\basap\b",
];

const PERSONAL_INFO_MARKERS: [&str; 13] = [
    r"\bpasswords?\b",
    r"\bsocial\s+security\b",
    r"\bssn\b",
    r"\bcredit\s+card\b",
    r"\bcard\s+number\b",
    r"\bcvv\b",
    r"\bbank\s+account\b",
    r"\brouting\s+number\b",
    r"\bdate\s+of\s+birth\b",
    r"\bpin\s+(number|code)\b",
    r"\blogin\s+credentials\b",
    r"\bconfirm\s+your\s+identity\b",
    r"\bmother'?s\s+maiden\s+name\b",
];

/// TLDs that are cheap to register and heavily abused.
const SUSPICIOUS_TLDS: [&str; 16] = [
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "work", "click", "link", "buzz", "cam", "icu",
    "surf", "monster", "uno",
];

const EXECUTABLE_EXTENSIONS: [&str; 14] = [
    ".exe", ".scr", ".js", ".zip", ".bat", ".cmd", ".msi", ".vbs", ".jar", ".apk", ".ps1", ".iso",
    ".rar", ".7z",
];

static URGENCY: LazyLock<RegexSet> = LazyLock::new(|| marker_set(&URGENCY_MARKERS));
static PERSONAL_INFO: LazyLock<RegexSet> = LazyLock::new(|| marker_set(&PERSONAL_INFO_MARKERS));

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?i)\b(?:https?://|www\.)[^\s<>"'`]+"#,
        r#"|\bdata:[a-z]+/[a-z0-9.+-]+[;,][^\s<>"'`]*"#,
        r#"|\bjavascript:[^\s<>"'`]+"#,
    ))
    .expect("link pattern is valid")
});

fn marker_set(patterns: &[&str]) -> RegexSet {
    RegexSetBuilder::new(patterns).case_insensitive(true).build().expect("marker patterns are valid")
}

/// Turns messages into [`FeatureVector`]s, consulting a [`ReputationProvider`] for the
/// sender domain.
#[derive(Debug, Clone)]
pub struct FeatureExtractor<R = StaticReputation> {
    provider: R,
    unknown_score: f64,
    lookup_timeout: Duration,
}

impl FeatureExtractor<StaticReputation> {
    #[must_use]
    pub fn from_config(config: &ReputationConfig) -> Self {
        Self::new(StaticReputation::from_config(config), config)
    }
}

impl<R: ReputationProvider> FeatureExtractor<R> {
    #[must_use]
    pub fn new(provider: R, config: &ReputationConfig) -> Self {
        Self {
            provider,
            unknown_score: config.unknown_score.clamp(0.0, 1.0),
            lookup_timeout: Duration::from_millis(config.lookup_timeout_ms),
        }
    }

    #[must_use]
    pub const fn provider(&self) -> &R {
        &self.provider
    }

    /// Looks up the sender's reputation, then extracts every other signal.
    ///
    /// A failed or slow lookup degrades to the unknown score; it never fails the call.
    pub async fn extract(&self, message: &EmailMessage) -> FeatureVector {
        let domain = sender_domain(&message.sender);
        let reputation = match &domain {
            Some(domain) => self.lookup(domain).await,
            None => None,
        };
        self.features(message, domain, reputation)
    }

    /// Pure extraction with a reputation that is already known.
    ///
    /// `None` means the sender is unknown and the configured unknown score applies.
    #[must_use]
    pub fn extract_with_reputation(&self, message: &EmailMessage, reputation: Option<f64>) -> FeatureVector {
        self.features(message, sender_domain(&message.sender), reputation)
    }

    fn features(&self, message: &EmailMessage, domain: Option<String>, reputation: Option<f64>) -> FeatureVector {
        let text = scan_window(message);

        let urgency_hits = count_matches(&URGENCY, &text);
        let personal_info_hits = count_matches(&PERSONAL_INFO, &text);

        let mut external_link_count = 0u32;
        let mut suspicious_link_count = 0u32;
        let mut executable_link_count = 0u32;
        for link in LINK.find_iter(&text) {
            let traits = inspect_link(link.as_str());
            external_link_count = external_link_count.saturating_add(1);
            suspicious_link_count = suspicious_link_count.saturating_add(u32::from(traits.suspicious));
            executable_link_count = executable_link_count.saturating_add(u32::from(traits.executable));
        }

        let reputation = reputation.filter(|score| score.is_finite()).map(|score| score.clamp(0.0, 1.0));

        FeatureVector {
            has_urgency_language: urgency_hits > 0,
            urgency_hits,
            external_link_count,
            suspicious_link_count,
            executable_link_count,
            sender_domain: domain,
            sender_domain_reputation: reputation.unwrap_or(self.unknown_score),
            reputation_known: reputation.is_some(),
            requests_personal_info: personal_info_hits > 0,
            personal_info_hits,
        }
    }

    async fn lookup(&self, domain: &str) -> Option<f64> {
        match tokio::time::timeout(self.lookup_timeout, self.provider.lookup(domain)).await {
            Ok(Ok(score)) => {
                debug!(domain, ?score, "Sender reputation resolved");
                score
            }
            Ok(Err(err)) => {
                warn!(domain, kind = err.kind(), error = %err, "Reputation lookup failed, using unknown score");
                None
            }
            Err(_) => {
                warn!(
                    domain,
                    timeout_ms = self.lookup_timeout.as_millis(),
                    "Reputation lookup timed out, using unknown score"
                );
                None
            }
        }
    }
}

/// Lowercased domain of `Name <user@host>` or a bare `user@host`.
///
/// Returns `None` unless the host is a dotted name made of letters, digits and hyphens.
#[must_use]
pub fn sender_domain(sender: &str) -> Option<String> {
    let address = match (sender.rfind('<'), sender.rfind('>')) {
        (Some(open), Some(close)) if open < close => &sender[open + 1..close],
        _ => sender,
    };
    let (_, host) = address.trim().rsplit_once('@')?;
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();

    let valid = host.contains('.')
        && host.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    valid.then_some(host)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct LinkTraits {
    suspicious: bool,
    executable: bool,
}

fn inspect_link(raw: &str) -> LinkTraits {
    let lower = raw.trim_end_matches(['.', ',', ';', ':', '!', '?', ')']).to_ascii_lowercase();
    if lower.starts_with("data:") || lower.starts_with("javascript:") {
        return LinkTraits { suspicious: true, executable: false };
    }

    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let (authority, path) = rest.split_at(rest.find(['/', '?', '#']).unwrap_or(rest.len()));
    let (has_userinfo, host) = match authority.rsplit_once('@') {
        Some((_, host)) => (true, host),
        None => (false, authority),
    };
    let host = strip_port(host);

    let path = path.split(['?', '#']).next().unwrap_or_default();
    LinkTraits {
        suspicious: has_userinfo || is_ip_literal(host) || has_suspicious_tld(host) || host.contains("xn--"),
        executable: EXECUTABLE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)),
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}

fn is_ip_literal(host: &str) -> bool {
    host.starts_with('[')
        || host.parse::<Ipv4Addr>().is_ok()
        || (!host.is_empty() && host.chars().all(|c| c.is_ascii_digit()))
}

fn has_suspicious_tld(host: &str) -> bool {
    host.rsplit('.').next().is_some_and(|tld| SUSPICIOUS_TLDS.contains(&tld))
}

fn count_matches(set: &RegexSet, text: &str) -> u32 {
    u32::try_from(set.matches(text).iter().count()).unwrap_or(u32::MAX)
}

/// Subject, newline and body, copied only up to [`MAX_SCAN_BYTES`].
fn scan_window(message: &EmailMessage) -> String {
    let subject = clip(&message.subject, MAX_SCAN_BYTES);
    let body = clip(&message.body, MAX_SCAN_BYTES.saturating_sub(subject.len() + 1));

    let mut text = String::with_capacity(subject.len() + 1 + body.len());
    text.push_str(subject);
    if subject.len() < MAX_SCAN_BYTES {
        text.push('\n');
        text.push_str(body);
    }
    text
}

/// Longest prefix of `text` within `max` bytes that ends on a char boundary.
fn clip(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::from_config(&ReputationConfig::default())
    }

    fn features(subject: &str, body: &str) -> FeatureVector {
        extractor().extract_with_reputation(&EmailMessage::new("a@b.example", subject, body), None)
    }

    #[test]
    fn marker_patterns_compile() {
        assert_eq!(URGENCY.len(), URGENCY_MARKERS.len());
        assert_eq!(PERSONAL_INFO.len(), PERSONAL_INFO_MARKERS.len());
        assert!(LINK.is_match("http://x.example"));
    }

    #[test]
    fn urgency_markers_are_counted_once_each() {
        let f = features("URGENT", "urgent! Verify now, click, CLICK, verify");

        assert!(f.has_urgency_language);
        assert_eq!(f.urgency_hits, 3);
    }

    #[test]
    fn urgency_needs_whole_words() {
        let f = features("", "The clicker verifying process is suspenseful");
        assert_eq!(f.urgency_hits, 0);
    }

    #[test]
    fn personal_info_phrases() {
        let f = features("", "Send your Password and Social  Security number with your PIN code");

        assert!(f.requests_personal_info);
        assert_eq!(f.personal_info_hits, 3);
    }

    #[test]
    fn links_are_counted_and_classified() {
        let f = features(
            "",
            "see https://shop.example/cart, http://192.168.1.7/login, www.free.tk and \
             https://cdn.example/setup.exe?x=1 plus javascript:alert(1)",
        );

        assert_eq!(f.external_link_count, 5);
        assert_eq!(f.suspicious_link_count, 3);
        assert_eq!(f.executable_link_count, 1);
    }

    #[test]
    fn link_inspection_details() {
        assert!(inspect_link("http://user@evil.example/").suspicious);
        assert!(inspect_link("http://[::1]:8080/").suspicious);
        assert!(inspect_link("http://3232235777/").suspicious);
        assert!(inspect_link("https://xn--pple-43d.com/").suspicious);
        assert!(inspect_link("https://files.example/doc.ZIP.").executable);
        assert_eq!(inspect_link("https://bank.example:443/account"), LinkTraits::default());
    }

    #[test]
    fn plain_words_are_not_uris() {
        let f = features("", "metadata: none. Please enable javascript : thanks");
        assert_eq!(f.external_link_count, 0);
    }

    #[test]
    fn sender_domain_parsing() {
        assert_eq!(sender_domain("Alerts <Alerts@Mail.Bank.Example>").as_deref(), Some("mail.bank.example"));
        assert_eq!(sender_domain("  bob@example.com. ").as_deref(), Some("example.com"));
        assert_eq!(sender_domain("\"a@b\" <c@d.example>").as_deref(), Some("d.example"));
        assert_eq!(sender_domain("no-at-sign"), None);
        assert_eq!(sender_domain("x@localhost"), None);
        assert_eq!(sender_domain("x@[10.0.0.1]"), None);
        assert_eq!(sender_domain("x@bad_host.example"), None);
        assert_eq!(sender_domain(""), None);
    }

    #[test]
    fn blank_message_yields_low_signal_vector() {
        let f = extractor().extract_with_reputation(&EmailMessage::new("", "", ""), None);

        assert_eq!(f, FeatureVector::default());
    }

    #[test]
    fn reputation_is_clamped_and_nan_is_unknown() {
        let e = extractor();
        let msg = EmailMessage::new("a@b.example", "hi", "there");

        assert!((e.extract_with_reputation(&msg, Some(7.0)).sender_domain_reputation - 1.0).abs() < f64::EPSILON);
        let nan = e.extract_with_reputation(&msg, Some(f64::NAN));
        assert!(!nan.reputation_known);
        assert!((nan.sender_domain_reputation - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn oversized_input_is_truncated_on_a_char_boundary() {
        let body = "é".repeat(MAX_SCAN_BYTES);
        let text = scan_window(&EmailMessage::new("", "", body));

        assert!(text.len() <= MAX_SCAN_BYTES);
        assert!(text.is_char_boundary(text.len()));
    }

    #[test]
    fn scan_window_copies_only_the_budget() {
        let subject = "u".repeat(MAX_SCAN_BYTES * 2);
        let body = "b".repeat(MAX_SCAN_BYTES * 2);

        let text = scan_window(&EmailMessage::new("", subject, body.as_str()));
        assert_eq!(text.len(), MAX_SCAN_BYTES);
        assert!(text.capacity() <= MAX_SCAN_BYTES + 1);
        assert!(text.bytes().all(|b| b == b'u'));

        let text = scan_window(&EmailMessage::new("", "URGENT", body));
        assert_eq!(text.len(), MAX_SCAN_BYTES);
        assert!(text.starts_with("URGENT\nbbb"));
    }

    #[test]
    fn clip_respects_multibyte_boundaries() {
        assert_eq!(clip("héllo", 2), "h");
        assert_eq!(clip("héllo", 3), "hé");
        assert_eq!(clip("hi", 10), "hi");
    }
}
