//! Data parts.

use serde_json::Value;

use super::config::ReducerConfig;
use super::metadata::deep_merge;
use super::state::{MessageState, PartChange};
use crate::types::{DataPart, UiChunk, UiPart};

impl MessageState {
    fn find_data_part(&self, data_type: &str, id: Option<&String>) -> Option<usize> {
        self.data.get(&(data_type.to_string(), id.cloned())).copied()
    }

    fn data_part_mut(&mut self, idx: usize) -> Option<&mut DataPart> {
        match self.message.parts.get_mut(idx) {
            Some(UiPart::Data(part)) => Some(part),
            _ => None,
        }
    }

    /// Every data chunk reaches `on_data`. Transient data stops there;
    /// otherwise a part with the same `(dataType, id)` is updated in place,
    /// a configured reducer folds id-less data of its type into the latest
    /// part, and anything else is appended.
    pub(super) fn apply_data(
        &mut self,
        chunk: &UiChunk,
        data_type: &str,
        data: &Value,
        id: Option<&String>,
        transient: bool,
        config: &ReducerConfig,
    ) -> PartChange {
        let part = DataPart {
            data_type: data_type.to_string(),
            id: id.cloned(),
            data: data.clone(),
        };
        if let Some(handler) = &config.on_data {
            handler(&part);
        }
        if transient {
            return PartChange::None;
        }

        if id.is_some() {
            if let Some(idx) = self.find_data_part(data_type, id) {
                if let Some(existing) = self.data_part_mut(idx) {
                    existing.data = deep_merge(existing.data.take(), data);
                }
                return PartChange::Updated(idx);
            }
        } else if let Some(reducer) = config.data_reducers.get(data_type)
            && let Some(idx) = self.find_data_part(data_type, None)
        {
            if let Some(existing) = self.data_part_mut(idx) {
                existing.data = reducer.reduce(&existing.data, data);
            }
            return PartChange::Updated(idx);
        }

        let key = (part.data_type.clone(), part.id.clone());
        let change = self.push_part(UiPart::Data(part), chunk, config);
        if let PartChange::Appended(idx) = change {
            self.data.insert(key, idx);
        }
        change
    }
}
