//! Public suffix registry.
//!
//! This module knows which multi-label suffixes (like `co.uk`) act as a single
//! registry unit, so that the registrable name of `shop.example.co.uk` is
//! `example` and not `co`. Single-label TLDs need no table: any final label is
//! a valid suffix when no longer rule matches.

use std::collections::HashSet;

/// Multi-label public suffixes under which second-level registrations happen.
///
/// This is the subset of the Public Suffix List that matters for brand
/// monitoring: country-code second levels used by registrars, plus a few
/// well-known private suffixes where anyone can obtain a name.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    // United Kingdom
    "co.uk", "org.uk", "me.uk", "ltd.uk", "plc.uk", "net.uk", "ac.uk", "gov.uk", "nhs.uk",
    "sch.uk",
    // Australia / New Zealand
    "com.au", "net.au", "org.au", "edu.au", "gov.au", "asn.au", "id.au",
    "co.nz", "net.nz", "org.nz", "govt.nz", "ac.nz",
    // Asia
    "co.jp", "ne.jp", "or.jp", "ac.jp", "go.jp", "gr.jp",
    "co.kr", "or.kr", "ne.kr", "go.kr",
    "com.cn", "net.cn", "org.cn", "gov.cn", "edu.cn",
    "com.hk", "net.hk", "org.hk",
    "com.tw", "net.tw", "org.tw",
    "com.sg", "net.sg", "org.sg", "edu.sg",
    "com.my", "net.my", "org.my",
    "co.in", "net.in", "org.in", "firm.in", "gen.in", "ind.in", "ac.in", "gov.in",
    "co.id", "or.id", "web.id", "ac.id",
    "com.ph", "net.ph", "org.ph",
    "co.th", "in.th", "or.th", "ac.th",
    "com.vn", "net.vn",
    "com.pk", "net.pk", "org.pk",
    "co.il", "org.il", "net.il", "ac.il",
    "com.tr", "net.tr", "org.tr", "gen.tr",
    "com.sa", "net.sa",
    "co.ae", "net.ae",
    // Americas
    "com.br", "net.br", "org.br", "gov.br", "edu.br",
    "com.ar", "net.ar", "org.ar",
    "com.mx", "net.mx", "org.mx",
    "com.co", "net.co", "org.co",
    "com.pe", "net.pe",
    "com.ve", "co.ve",
    "com.uy", "com.ec",
    "co.cr",
    // Europe
    "co.at", "or.at",
    "com.pl", "net.pl", "org.pl",
    "com.es", "nom.es", "org.es",
    "com.pt",
    "com.gr",
    "com.ua", "net.ua", "org.ua",
    "com.ru", "net.ru", "org.ru",
    "co.hu",
    // Africa
    "co.za", "org.za", "net.za", "gov.za", "web.za",
    "com.ng", "org.ng",
    "co.ke", "or.ke",
    "com.eg",
    "co.ma",
    // Private suffixes
    "github.io", "gitlab.io", "herokuapp.com", "netlify.app", "vercel.app", "pages.dev",
    "blogspot.com", "appspot.com", "azurewebsites.net", "cloudfront.net", "web.app",
    "firebaseapp.com",
];

lazy_static::lazy_static! {
    static ref SUFFIX_SET: HashSet<&'static str> = MULTI_LABEL_SUFFIXES.iter().copied().collect();
}

/// Whether `suffix` is a known multi-label public suffix.
pub fn is_multi_label_suffix(suffix: &str) -> bool {
    SUFFIX_SET.contains(suffix)
}

/// Number of trailing labels that form the public suffix of `labels`.
///
/// The longest known suffix wins; otherwise the last label alone is the
/// suffix. Never returns more than `labels.len()`.
///
/// # Examples
///
/// ```rust
/// use typoscan_lib::protocols::registry::suffix_label_count;
///
/// assert_eq!(suffix_label_count(&["example", "com"]), 1);
/// assert_eq!(suffix_label_count(&["shop", "example", "co", "uk"]), 2);
/// ```
pub fn suffix_label_count(labels: &[&str]) -> usize {
    if labels.is_empty() {
        return 0;
    }

    for start in 0..labels.len().saturating_sub(1) {
        let candidate = labels[start..].join(".");
        if is_multi_label_suffix(&candidate) {
            return labels.len() - start;
        }
    }

    1
}

/// Every known multi-label suffix, sorted.
pub fn known_multi_label_suffixes() -> Vec<&'static str> {
    let mut suffixes = MULTI_LABEL_SUFFIXES.to_vec();
    suffixes.sort_unstable();
    suffixes.dedup();
    suffixes
}
