pub use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};

pub use anyhow::{anyhow, Result};
pub use indexmap::{IndexMap, IndexSet};
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};
pub use tracing::{debug, error, info, warn};

pub use crate::address::Address;
pub use crate::constants::*;
pub use crate::program::*;
