use catalog_core::{CardHandle, ExtractedRecord};
use engine_logging::engine_trace;

use crate::config::FieldProbe;
use crate::{PageSource, ProbeMiss};

/// Reads the configured fields of one card.
///
/// - every field is probed independently; a miss becomes `""`
/// - a card inside the excluded section yields `None`, not an empty record
#[derive(Debug, Clone)]
pub struct ProbeExtractor {
    category_id: String,
    fields: Vec<FieldProbe>,
    excluded_section: Option<String>,
}

impl ProbeExtractor {
    pub fn new(
        category_id: impl Into<String>,
        fields: Vec<FieldProbe>,
        excluded_section: Option<String>,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            fields,
            excluded_section,
        }
    }

    pub async fn extract(
        &self,
        source: &dyn PageSource,
        card: &CardHandle,
    ) -> Option<ExtractedRecord> {
        if let Some(section) = self.excluded_section.as_deref() {
            // An unreadable ancestry counts as "not excluded".
            if source.in_excluded_section(card, section).await.unwrap_or(false) {
                engine_trace!("card {} skipped: inside {}", card.index(), section);
                return None;
            }
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        for probe in &self.fields {
            let value = value_or_empty(probe_field(source, card, probe).await);
            fields.push((probe.name.clone(), value));
        }
        Some(ExtractedRecord::new(self.category_id.clone(), fields))
    }
}

async fn probe_field(
    source: &dyn PageSource,
    card: &CardHandle,
    probe: &FieldProbe,
) -> Result<String, ProbeMiss> {
    match probe.join.as_deref() {
        Some(separator) => {
            let values = source.read_all_text(card, &probe.selector).await?;
            Ok(values.join(separator))
        }
        None => source.read_text(card, &probe.selector).await,
    }
}

fn value_or_empty(result: Result<String, ProbeMiss>) -> String {
    match result {
        Ok(value) => value,
        Err(miss) => {
            engine_trace!("probe miss: {}", miss);
            String::new()
        }
    }
}
