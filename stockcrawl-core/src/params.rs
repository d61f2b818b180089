//! Per-call source parameters and `{placeholder}` templating.

use thiserror::Error;

/// Placeholders a URL template or JSON pointer may use.
pub const PLACEHOLDERS: &[&str] = &["ticker", "kind", "timeframe", "count", "page"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}}")]
    Unknown(String),

    #[error("no value for placeholder {{{0}}}")]
    Missing(String),

    #[error("unclosed placeholder in {0:?}")]
    Unclosed(String),
}

/// Values that vary per retrieval call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceParams {
    pub ticker: Option<String>,
    pub kind: Option<String>,
    pub timeframe: Option<String>,
    pub count: Option<u32>,
    /// Elapsed months; drives the fixed page ceiling of fund price walks.
    pub n_months: Option<u32>,
}

impl SourceParams {
    pub fn for_ticker(ticker: impl Into<String>) -> Self {
        Self {
            ticker: Some(ticker.into()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = Some(timeframe.into());
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_months(mut self, n_months: u32) -> Self {
        self.n_months = Some(n_months);
        self
    }

    fn lookup(&self, name: &str, page: Option<u32>) -> Option<String> {
        match name {
            "ticker" => self.ticker.clone(),
            "kind" => self.kind.clone(),
            "timeframe" => self.timeframe.clone(),
            "count" => self.count.map(|c| c.to_string()),
            "page" => page.map(|p| p.to_string()),
            _ => None,
        }
    }

    /// Substitute every `{name}` in `template`.
    pub fn render(&self, template: &str, page: Option<u32>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len() + 16);
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| TemplateError::Unclosed(template.to_string()))?;
            let name = &after[..close];
            if !PLACEHOLDERS.contains(&name) {
                return Err(TemplateError::Unknown(name.to_string()));
            }
            let value = self
                .lookup(name, page)
                .ok_or_else(|| TemplateError::Missing(name.to_string()))?;
            out.push_str(&value);
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Placeholder names used by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Result<Vec<&str>, TemplateError> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| TemplateError::Unclosed(template.to_string()))?;
        let name = &after[..close];
        if !PLACEHOLDERS.contains(&name) {
            return Err(TemplateError::Unknown(name.to_string()));
        }
        names.push(name);
        rest = &after[close + 1..];
    }
    Ok(names)
}
