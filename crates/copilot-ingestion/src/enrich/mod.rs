//! Enrich stage: runs algorithmic enrichers over parent chunks, plus an
//! optional LLM enricher (spec §4.6).

pub mod entities;
pub mod keywords;
pub mod llm;
pub mod metadata;

use crate::config::EnrichConfig;
use crate::types::{EnrichedParentChunk, ParentChunk};
use llm::HypotheticalQuestionProvider;
use std::collections::HashMap;
use tracing::instrument;

/// Runs the algorithmic enrichers (metadata, entities, keywords) and,
/// when enabled, the LLM hypothetical-question enricher over every
/// parent of one document. Never fails: enrichment degrades gracefully
/// per parent (spec §4.6, §7 `EnrichmentDegraded`).
#[instrument(skip(parents, config, llm_provider), fields(parent_count = parents.len()))]
pub async fn enrich(
    parents: Vec<ParentChunk>,
    config: &EnrichConfig,
    llm_provider: &dyn HypotheticalQuestionProvider,
) -> Vec<EnrichedParentChunk> {
    let corpus: Vec<&str> = parents.iter().map(|p| p.content.as_str()).collect();
    let tfidf = keywords::CorpusTfIdf::build(&corpus);

    let mut enriched = Vec::with_capacity(parents.len());
    for parent in parents {
        let derived = metadata::derive(&parent.content);
        let entity_list = entities::extract(&parent.content, config.max_entities_per_chunk);
        let keyword_list = tfidf.top_keywords(&parent.content, config.top_k_keywords);

        let hypothetical_questions = if config.enable_llm_enricher && config.enable_hypothetical_questions {
            llm::enrich_with_questions(llm_provider, &parent.content, config.top_k_keywords).await
        } else {
            Vec::new()
        };

        enriched.push(EnrichedParentChunk {
            parent,
            keywords: keyword_list,
            entities: entity_list,
            hypothetical_questions,
            char_count: derived.char_count,
            reading_time_seconds: derived.reading_time_seconds,
            extra: HashMap::new(),
        });
    }

    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::llm::NullProvider;
    use uuid::Uuid;

    fn parent(content: &str, ordinal: usize) -> ParentChunk {
        ParentChunk {
            id: Uuid::new_v4(),
            file_id: "f1".to_string(),
            document_id: "d1".to_string(),
            content: content.to_string(),
            section_path: "Section".to_string(),
            token_count: content.split_whitespace().count(),
            char_start: 0,
            char_end: content.len(),
            ordinal,
        }
    }

    #[tokio::test]
    async fn enriches_parents_with_keywords_and_metadata() {
        let parents = vec![
            parent("kubernetes deployment pipeline guide", 0),
            parent("terraform infrastructure pipeline guide", 1),
        ];
        let config = EnrichConfig { enable_llm_enricher: false, enable_hypothetical_questions: false, top_k_keywords: 3, max_entities_per_chunk: 10 };
        let enriched = enrich(parents, &config, &NullProvider).await;
        assert_eq!(enriched.len(), 2);
        for chunk in &enriched {
            assert!(chunk.char_count > 0);
            assert!(chunk.hypothetical_questions.is_empty());
        }
    }

    #[tokio::test]
    async fn keyword_count_never_exceeds_top_k() {
        let parents = vec![parent("alpha beta gamma delta epsilon zeta eta theta", 0)];
        let config = EnrichConfig { enable_llm_enricher: false, enable_hypothetical_questions: false, top_k_keywords: 3, max_entities_per_chunk: 10 };
        let enriched = enrich(parents, &config, &NullProvider).await;
        assert!(enriched[0].keywords.len() <= 3);
    }
}
