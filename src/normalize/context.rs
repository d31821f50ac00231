use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::edgar::parsing::{Context, PeriodDescriptor};

/// Resolved contexts in document order, addressable by id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextTable {
    contexts: Vec<Context>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ContextTable {
    pub fn get(&self, id: &str) -> Option<&Context> {
        self.index.get(id).map(|&i| &self.contexts[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.contexts.iter()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    fn insert(&mut self, context: Context) {
        if self.index.contains_key(&context.id) {
            log::debug!("Ignoring duplicate context {}", context.id);
            return;
        }
        self.index.insert(context.id.clone(), self.contexts.len());
        self.contexts.push(context);
    }
}

impl FromIterator<Context> for ContextTable {
    fn from_iter<I: IntoIterator<Item = Context>>(iter: I) -> Self {
        let mut table = ContextTable::default();
        for context in iter {
            table.insert(context);
        }
        table
    }
}

pub fn resolve_contexts(descriptors: &[PeriodDescriptor]) -> ContextTable {
    descriptors.iter().filter_map(resolve_context).collect()
}

fn resolve_context(descriptor: &PeriodDescriptor) -> Option<Context> {
    let id = descriptor.context_id.as_str();

    // An instant wins over a start/end pair on the same context
    let context = if let Some(instant) = &descriptor.instant {
        parse_date(instant).map(|date| Context::instant(id, date))
    } else if let (Some(start), Some(end)) = (&descriptor.start_date, &descriptor.end_date) {
        match (parse_date(start), parse_date(end)) {
            (Some(start), Some(end)) => Some(Context::duration(id, start, end)),
            _ => None,
        }
    } else {
        None
    };

    if context.is_none() {
        log::debug!("Skipping malformed context {}: {:?}", id, descriptor);
    }
    context
}

/// `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.trim().split('T').next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
