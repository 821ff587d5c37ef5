//! Retrieval stage.
//!
//! Searches the collection(s) matching the classified domain. For `both`,
//! the civil and criminal result lists are merged by rank (civil first at
//! each rank) and passages whose text was already taken are skipped.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use lexrag_types::model::{DomainClassification, LawDomain, RetrievedPassage};

use super::traits::Retriever;

pub struct RetrievalStage {
    retriever: Arc<dyn Retriever>,
    top_k: usize,
}

impl RetrievalStage {
    pub fn new(retriever: Arc<dyn Retriever>, top_k: usize) -> Self {
        Self { retriever, top_k }
    }

    /// Passages for `query` in `domain`. Inadmissible domains and retriever
    /// errors yield an empty list.
    pub async fn retrieve(&self, query: &str, domain: DomainClassification) -> Vec<RetrievedPassage> {
        let mut per_collection = Vec::new();
        for collection in domain.retrieval_domains() {
            per_collection.push(self.retrieve_one(query, *collection).await);
        }

        let passages = interleave(per_collection);
        debug!(
            stage = "retrieval",
            domain = %domain,
            passages = passages.len(),
            "retrieval complete"
        );
        passages
    }

    async fn retrieve_one(&self, query: &str, collection: LawDomain) -> Vec<RetrievedPassage> {
        match self.retriever.retrieve(query, collection, self.top_k).await {
            Ok(mut passages) => {
                passages.truncate(self.top_k);
                passages
            }
            Err(e) => {
                warn!(stage = "retrieval", collection = %collection, error = %e, "retriever failed");
                Vec::new()
            }
        }
    }
}

/// Merge ranked lists rank by rank, dropping repeated passage texts.
pub fn interleave(lists: Vec<Vec<RetrievedPassage>>) -> Vec<RetrievedPassage> {
    let longest = lists.iter().map(Vec::len).max().unwrap_or(0);
    let mut iters: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for _ in 0..longest {
        for iter in &mut iters {
            if let Some(passage) = iter.next()
                && seen.insert(passage.text.clone())
            {
                merged.push(passage);
            }
        }
    }
    merged
}

/// Context handed to generation and summarization: passage texts joined by
/// single spaces.
pub fn context_text(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lexrag_types::ServiceError;
    use std::sync::Mutex;

    fn passage(text: &str, domain: LawDomain) -> RetrievedPassage {
        RetrievedPassage {
            text: text.into(),
            source: format!("{domain} source"),
            domain,
            score: 1.0,
        }
    }

    struct TestRetriever {
        civil: Result<Vec<RetrievedPassage>, ServiceError>,
        criminal: Result<Vec<RetrievedPassage>, ServiceError>,
        calls: Mutex<Vec<LawDomain>>,
    }

    #[async_trait]
    impl Retriever for TestRetriever {
        async fn retrieve(
            &self,
            _query: &str,
            domain: LawDomain,
            _top_k: usize,
        ) -> Result<Vec<RetrievedPassage>, ServiceError> {
            self.calls.lock().unwrap().push(domain);
            match domain {
                LawDomain::Civil => self.civil.clone(),
                LawDomain::Criminal => self.criminal.clone(),
            }
        }
    }

    fn retriever(
        civil: Result<Vec<RetrievedPassage>, ServiceError>,
        criminal: Result<Vec<RetrievedPassage>, ServiceError>,
    ) -> Arc<TestRetriever> {
        Arc::new(TestRetriever {
            civil,
            criminal,
            calls: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn both_interleaves_and_dedups() {
        let r = retriever(
            Ok(vec![
                passage("c1", LawDomain::Civil),
                passage("shared", LawDomain::Civil),
                passage("c3", LawDomain::Civil),
            ]),
            Ok(vec![
                passage("k1", LawDomain::Criminal),
                passage("shared", LawDomain::Criminal),
            ]),
        );
        let stage = RetrievalStage::new(r.clone(), 5);
        let passages = stage.retrieve("q", DomainClassification::Both).await;

        let texts: Vec<_> = passages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["c1", "k1", "shared", "c3"]);
        // First occurrence wins.
        assert_eq!(passages[2].domain, LawDomain::Civil);
        assert_eq!(*r.calls.lock().unwrap(), vec![LawDomain::Civil, LawDomain::Criminal]);
    }

    #[tokio::test]
    async fn single_domain_queries_one_collection() {
        let r = retriever(Ok(vec![passage("c1", LawDomain::Civil)]), Ok(Vec::new()));
        let stage = RetrievalStage::new(r.clone(), 5);
        let passages = stage.retrieve("q", DomainClassification::Criminal).await;
        assert!(passages.is_empty());
        assert_eq!(*r.calls.lock().unwrap(), vec![LawDomain::Criminal]);
    }

    #[tokio::test]
    async fn retriever_error_is_empty_for_that_collection() {
        let r = retriever(
            Err(ServiceError::Unavailable("civil index".into())),
            Ok(vec![passage("k1", LawDomain::Criminal)]),
        );
        let stage = RetrievalStage::new(r, 5);
        let passages = stage.retrieve("q", DomainClassification::Both).await;
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "k1");
    }

    #[tokio::test]
    async fn results_truncated_to_top_k() {
        let r = retriever(
            Ok(vec![
                passage("a", LawDomain::Civil),
                passage("b", LawDomain::Civil),
                passage("c", LawDomain::Civil),
            ]),
            Ok(Vec::new()),
        );
        let stage = RetrievalStage::new(r, 2);
        assert_eq!(stage.retrieve("q", DomainClassification::Civil).await.len(), 2);
    }

    #[tokio::test]
    async fn inadmissible_domain_searches_nothing() {
        let r = retriever(Ok(vec![passage("a", LawDomain::Civil)]), Ok(Vec::new()));
        let stage = RetrievalStage::new(r.clone(), 5);
        assert!(stage.retrieve("q", DomainClassification::Unknown).await.is_empty());
        assert!(r.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn context_joins_with_spaces() {
        let passages = vec![passage("first.", LawDomain::Civil), passage("second.", LawDomain::Civil)];
        assert_eq!(context_text(&passages), "first. second.");
        assert_eq!(context_text(&[]), "");
    }
}
