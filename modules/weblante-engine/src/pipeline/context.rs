use weblante_common::{AgePolicy, DecisionRequest, SessionContext};

use crate::canonical::CanonicalUrl;
use crate::lexical::KeywordResult;

/// Per-decision state threaded through the stage list.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub request: DecisionRequest,
    pub session: SessionContext,
    pub url: CanonicalUrl,
    /// Set once the keyword stage has run.
    pub keywords: Option<KeywordResult>,
    /// The decision came out of the decision cache.
    pub served_from_cache: bool,
}

impl EvaluationContext {
    pub fn new(request: DecisionRequest, session: SessionContext) -> Self {
        let url = CanonicalUrl::parse(&request.url);
        Self {
            request,
            session,
            url,
            keywords: None,
            served_from_cache: false,
        }
    }

    pub fn policy(&self) -> Option<AgePolicy> {
        self.session.policy
    }

    pub fn is_search(&self) -> bool {
        self.url.is_search
    }

    /// Decoded search text, empty for page navigations.
    pub fn query(&self) -> &str {
        &self.url.query
    }

    /// Text the keyword scorer sees: the query for searches, otherwise the
    /// URL with every piece of page text.
    pub fn analysis_text(&self) -> String {
        if self.is_search() {
            return self.url.query.clone();
        }
        [
            self.request.url.as_str(),
            self.request.title.as_str(),
            self.request.description.as_str(),
            self.request.body.as_str(),
        ]
        .join("\n")
    }

    /// Keyword score so far, 0 before the keyword stage.
    pub fn keyword_score(&self) -> f64 {
        self.keywords.as_ref().map_or(0.0, |k| k.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_text_for_search_is_query() {
        let ctx = EvaluationContext::new(
            DecisionRequest::new("https://www.google.com/search?q=lego+castle").with_title("Google"),
            SessionContext::new(Some(10)),
        );
        assert!(ctx.is_search());
        assert_eq!(ctx.analysis_text(), "lego castle");
    }

    #[test]
    fn test_analysis_text_for_page_joins_fields() {
        let ctx = EvaluationContext::new(
            DecisionRequest::new("https://example.com/a")
                .with_title("Title")
                .with_description("Desc")
                .with_body("Body"),
            SessionContext::new(None),
        );
        assert_eq!(ctx.analysis_text(), "https://example.com/a\nTitle\nDesc\nBody");
        assert_eq!(ctx.keyword_score(), 0.0);
        assert!(ctx.policy().is_none());
    }
}
