//! Class label table. Position `i` names the model's output index `i`; the
//! order is fixed by the trained model and must not be changed on its own.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TumorClass {
    Glioma,
    Meningioma,
    NoTumor,
    Pituitary,
}

impl TumorClass {
    pub const COUNT: usize = 4;
    pub const ALL: [TumorClass; Self::COUNT] =
        [TumorClass::Glioma, TumorClass::Meningioma, TumorClass::NoTumor, TumorClass::Pituitary];

    pub fn from_index(index: usize) -> Option<Self> { Self::ALL.get(index).copied() }

    pub fn as_str(self) -> &'static str {
        match self {
            TumorClass::Glioma => "glioma",
            TumorClass::Meningioma => "meningioma",
            TumorClass::NoTumor => "notumor",
            TumorClass::Pituitary => "pituitary",
        }
    }
}

impl fmt::Display for TumorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}
