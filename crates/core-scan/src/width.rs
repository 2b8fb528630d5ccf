//! Display width oracle.
//!
//! A single seam through which every display-width decision flows. The
//! engine never hardcodes cell counts: hosts inject a [`WidthOracle`] at
//! buffer construction and the oracle must be deterministic and free of
//! side effects. [`DefaultWidthOracle`] is the `unicode-width` backed
//! implementation used when the host has no terminal-specific table.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Which width convention the oracle should apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidthMethod {
    /// Width of the whole cluster per UAX #11 resolved widths.
    #[default]
    Unicode,
    /// POSIX `wcwidth`-like: the base scalar decides, trailing marks are free.
    WcWidth,
}

/// Maps one grapheme cluster to its cell count.
///
/// Implementations must be pure: same cluster and method, same answer.
pub trait WidthOracle {
    fn cluster_width(&self, cluster: &str, method: WidthMethod) -> usize;
}

/// `unicode-width` backed oracle.
///
/// Non-empty clusters never report zero cells; a combining-only cluster is
/// clamped to one cell so it stays addressable by a cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWidthOracle;

impl WidthOracle for DefaultWidthOracle {
    fn cluster_width(&self, cluster: &str, method: WidthMethod) -> usize {
        if cluster.is_empty() {
            return 0;
        }
        match method {
            WidthMethod::Unicode => UnicodeWidthStr::width(cluster).max(1),
            WidthMethod::WcWidth => {
                let base = cluster.chars().next().and_then(UnicodeWidthChar::width);
                base.unwrap_or(1).max(1)
            }
        }
    }
}

/// Width configuration bundle handed to the fitting functions.
///
/// Tabs are special-cased here, before the oracle: a tab always occupies
/// `tab_width` cells so chunk widths stay independent of surrounding text.
#[derive(Clone, Copy)]
pub struct WidthPolicy<'a> {
    pub oracle: &'a dyn WidthOracle,
    pub method: WidthMethod,
    pub tab_width: usize,
}

impl<'a> WidthPolicy<'a> {
    pub fn new(oracle: &'a dyn WidthOracle, method: WidthMethod, tab_width: usize) -> Self {
        Self {
            oracle,
            method,
            tab_width,
        }
    }

    /// Cell count for one grapheme cluster under this policy.
    pub fn cluster_width(&self, cluster: &str) -> usize {
        if cluster == "\t" {
            self.tab_width
        } else {
            self.oracle.cluster_width(cluster, self.method)
        }
    }

    /// Sum of cluster widths over a whole string.
    pub fn text_width(&self, text: &str) -> usize {
        use unicode_segmentation::UnicodeSegmentation;
        if text.is_ascii() && !text.as_bytes().contains(&b'\t') {
            return text.len();
        }
        text.graphemes(true).map(|g| self.cluster_width(g)).sum()
    }
}

impl std::fmt::Debug for WidthPolicy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidthPolicy")
            .field("method", &self.method)
            .field("tab_width", &self.tab_width)
            .finish_non_exhaustive()
    }
}
