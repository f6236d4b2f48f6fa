pub mod normalize;

use tracing::debug;

use crate::core::schema::{CanonicalRecord, FieldMap};
use self::normalize::{clean_value, normalize_date};

pub trait FusionEngine {
    fn fuse(&self, maps: &[FieldMap]) -> CanonicalRecord;
}

/// Fill-if-empty merge: maps are applied in order and the first usable value
/// for a field wins. Later values never replace an earlier one, even when
/// they look better; there is no confidence signal to arbitrate.
#[derive(Debug, Clone)]
pub struct FirstWinsFusion {
    normalize_dates: bool,
}

impl Default for FirstWinsFusion {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FirstWinsFusion {
    pub fn new(normalize_dates: bool) -> Self {
        Self { normalize_dates }
    }

    pub fn apply(&self, record: &mut CanonicalRecord, map: &FieldMap) -> usize {
        let mut filled = 0;
        for (field, raw) in map.iter() {
            let Some(value) = clean_value(raw) else {
                continue;
            };
            if !record.is_sentinel(field) {
                debug!(field = field.as_str(), "keeping earlier value");
                continue;
            }
            let value = if self.normalize_dates && field.is_date() {
                normalize_date(value)
            } else {
                value.to_string()
            };
            record.set(field, value);
            filled += 1;
        }
        filled
    }
}

impl FusionEngine for FirstWinsFusion {
    fn fuse(&self, maps: &[FieldMap]) -> CanonicalRecord {
        let mut record = CanonicalRecord::empty();
        for map in maps {
            self.apply(&mut record, map);
        }
        record
    }
}
