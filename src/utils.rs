// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Internal utilities

use log::warn;

/// Merge two nested serde_yaml::Mapping structs.
///
/// The values from src are merged into dest. Scalar values in src replace values in dest only
/// when `overwrite` is true, missing keys are always added.
pub fn merge_mappings(src: serde_yaml::Mapping, dest: &mut serde_yaml::Mapping, overwrite: bool) {
    for (src_key, src_value) in src.into_iter() {
        match (src_value, dest.get_mut(&src_key)) {
            (
                serde_yaml::Value::Mapping(src_mapping),
                Some(serde_yaml::Value::Mapping(dest_mapping)),
            ) => {
                merge_mappings(src_mapping, dest_mapping, overwrite);
            }
            (serde_yaml::Value::Mapping(src_mapping), Some(dest_value)) => {
                warn!(
                    "Type mismatch while merging mappings. Expected {:?} to be a Mapping. Overriding destination.",
                    dest_value
                );
                let _ = dest.insert(src_key, serde_yaml::Value::Mapping(src_mapping));
            }
            (other, Some(_)) => {
                if overwrite {
                    let _ = dest.insert(src_key, other);
                }
            }
            (other, None) => {
                let _ = dest.insert(src_key, other);
            }
        }
    }
}
