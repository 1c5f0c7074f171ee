// Copyright 2018-2021 Dmitry Tantsur <dtantsur@protonmail.com>
//
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

//! Support for cloud configuration file.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;

use super::cloud::CloudConfig;
use crate::utils;
use crate::{Error, ErrorKind};

#[derive(Debug, Deserialize)]
struct Root {
    clouds: HashMap<String, CloudConfig>,
}

fn mapping_under<'m>(
    root: &'m mut serde_yaml::Mapping,
    key: &str,
    file: &str,
) -> Result<&'m mut serde_yaml::Mapping, Error> {
    match root.get_mut(key).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("{} must contain a {} object", file, key),
        )
    })? {
        serde_yaml::Value::Mapping(map) => Ok(map),
        other => Err(Error::new(
            ErrorKind::InvalidConfig,
            format!("{} object must be a mapping, got {:?}", key, other),
        )),
    }
}

/// Merge profiles from clouds-public.yaml into the clouds that reference them.
fn inject_profiles(
    clouds_public: &mut serde_yaml::Mapping,
    clouds: &mut serde_yaml::Mapping,
) -> Result<(), Error> {
    let clouds_mapping = mapping_under(clouds, "clouds", "clouds.yaml")?;
    let profiles = mapping_under(clouds_public, "public-clouds", "clouds-public.yaml")?;

    for (cloud_name, cloud) in clouds_mapping.iter_mut() {
        let cloud_mapping = match cloud.as_mapping_mut() {
            Some(mapping) => mapping,
            None => {
                warn!("Cloud record {:?} is not a mapping, ignoring", cloud_name);
                continue;
            }
        };

        let profile_value = match cloud_mapping.get("profile") {
            Some(value) => value,
            None => continue,
        };

        let profile_name = profile_value.as_str().ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidConfig,
                format!("Profile name {:?} is not a string", profile_value),
            )
        })?;

        match profiles.get(profile_name) {
            Some(serde_yaml::Value::Mapping(profile)) => {
                debug!("Applying profile {} to cloud {:?}", profile_name, cloud_name);
                // Keys already present in the cloud win.
                utils::merge_mappings(profile.clone(), cloud_mapping, false);
            }
            Some(other) => {
                return Err(Error::new(
                    ErrorKind::InvalidConfig,
                    format!("Profile {} must be a mapping, got {:?}", profile_name, other),
                ));
            }
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidConfig,
                    format!("Missing profile {} in clouds-public.yaml", profile_name),
                ));
            }
        }
    }

    Ok(())
}

fn find_config<S: AsRef<str>>(filename: S) -> Option<PathBuf> {
    let filename = filename.as_ref();
    let current = Path::new(filename);
    if current.is_file() {
        match current.canonicalize() {
            Ok(val) => return Some(val),
            Err(e) => warn!("Cannot canonicalize {:?}: {}", current, e),
        }
    }

    if let Some(mut home) = dirs::home_dir() {
        home.push(".config/openstack");
        home.push(filename);
        if home.is_file() {
            return Some(home);
        }
    } else {
        warn!("Cannot find home directory");
    }

    let abs = Path::new("/etc/openstack").join(filename);
    if abs.is_file() {
        Some(abs)
    } else {
        None
    }
}

#[inline]
fn with_one_key(key: &str) -> serde_yaml::Mapping {
    let mut result = serde_yaml::Mapping::with_capacity(1);
    let _ = result.insert(
        key.into(),
        serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
    );
    result
}

fn read_yaml(filename: &str, default_root_key: Option<&str>) -> Result<serde_yaml::Mapping, Error> {
    let path = match (find_config(filename), default_root_key) {
        (Some(path), _) => path,
        (None, Some(default)) => return Ok(with_one_key(default)),
        (None, None) => {
            return Err(Error::new(
                ErrorKind::InvalidConfig,
                format!("{} was not found in any location", filename),
            ))
        }
    };
    debug!("Reading {} from {:?}", filename, path);

    let content = File::open(path).map_err(|e| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("Cannot read {}: {}", filename, e),
        )
    })?;

    match serde_yaml::from_reader(content).map_err(|e| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("Cannot parse {}: {}", filename, e),
        )
    })? {
        serde_yaml::Value::Mapping(mapping) => Ok(mapping),
        other => Err(Error::new(
            ErrorKind::InvalidConfig,
            format!("Root of {} is {:?}, not a mapping", filename, other),
        )),
    }
}

fn from_files(
    name: &str,
    mut clouds: serde_yaml::Mapping,
    mut clouds_public: serde_yaml::Mapping,
    secure: serde_yaml::Mapping,
) -> Result<CloudConfig, Error> {
    utils::merge_mappings(secure, &mut clouds, true);

    inject_profiles(&mut clouds_public, &mut clouds)?;

    let mut root: Root = serde_yaml::from_value(serde_yaml::Value::Mapping(clouds)).map_err(|e| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("Cannot parse the merged cloud configuration: {}", e),
        )
    })?;

    root.clouds
        .remove(name)
        .ok_or_else(|| Error::new(ErrorKind::InvalidConfig, format!("No such cloud: {}", name)))
}

/// Load a cloud configuration from `clouds.yaml` and its companion files.
pub(crate) fn from_config(cloud_name: &str) -> Result<CloudConfig, Error> {
    let clouds = read_yaml("clouds.yaml", None)?;
    let clouds_public = read_yaml("clouds-public.yaml", Some("public-clouds"))?;
    let secure = read_yaml("secure.yaml", Some("clouds"))?;

    from_files(cloud_name, clouds, clouds_public, secure)
}

#[cfg(test)]
pub mod test {
    use super::{find_config, from_files, inject_profiles, read_yaml, with_one_key};
    use crate::utils::test::to_yaml;
    use crate::ErrorKind;

    fn cloud_value<'m>(clouds: &'m serde_yaml::Mapping, path: &[&str]) -> &'m serde_yaml::Value {
        let mut current = clouds
            .get("clouds")
            .and_then(|c| c.get("cloud_name"))
            .unwrap();
        for key in path {
            current = current.get(*key).unwrap();
        }
        current
    }

    #[test]
    fn test_from_config() {
        let clouds = to_yaml(
            r#"clouds:
  cloud_name:
    auth:
      auth_url: http://url1
      username: user1
    profile: test_profile"#,
        );

        let clouds_public = to_yaml(
            r#"public-clouds:
  test_profile:
    auth:
      project_name: project1
    region_name: region1"#,
        );

        let secure = to_yaml(
            r#"clouds:
  cloud_name:
    auth:
      password: password1"#,
        );

        let cfg = from_files("cloud_name", clouds, clouds_public, secure).unwrap();
        let auth = cfg.auth.as_ref().unwrap();
        assert_eq!(auth.username.as_deref(), Some("user1"));
        assert_eq!(auth.password.as_deref(), Some("password1"));
        assert_eq!(auth.project_name.as_deref(), Some("project1"));
        let _ = cfg.create_client().unwrap();
    }

    #[test]
    fn test_from_config_password() {
        let clouds = to_yaml(
            r#"clouds:
  cloud_name:
    auth_type: password
    auth:
      auth_url: http://url1
      username: user1
      password: password1
    region_name: region1"#,
        );

        let cfg = from_files(
            "cloud_name",
            clouds,
            with_one_key("public-clouds"),
            with_one_key("clouds"),
        )
        .unwrap();
        assert_eq!(cfg.auth_type(), Some("password"));
        let _ = cfg.create_client().unwrap();
    }

    #[test]
    fn test_from_config_v3token() {
        let clouds = to_yaml(
            r#"clouds:
  cloud_name:
    auth_type: v3token
    auth:
      auth_url: http://url1
      token: abcdef
      project_id: "1234""#,
        );

        let cfg = from_files(
            "cloud_name",
            clouds,
            with_one_key("public-clouds"),
            with_one_key("clouds"),
        )
        .unwrap();
        let _ = cfg.create_client().unwrap();
    }

    #[test]
    fn test_from_config_fixed_token() {
        let clouds = to_yaml(
            r#"clouds:
  cloud_name:
    auth_type: token
    auth:
      token: abcdef"#,
        );

        let cfg = from_files(
            "cloud_name",
            clouds,
            with_one_key("public-clouds"),
            with_one_key("clouds"),
        )
        .unwrap();
        let _ = cfg.create_client().unwrap();
    }

    #[test]
    fn test_from_config_no_such_cloud() {
        let clouds = to_yaml(
            r#"clouds:
  cloud_name:
    auth_type: token
    auth:
      token: abcdef"#,
        );

        let err = from_files(
            "other_cloud",
            clouds,
            with_one_key("public-clouds"),
            with_one_key("clouds"),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert!(err.to_string().contains("No such cloud: other_cloud"));
    }

    #[test]
    fn test_from_config_cacert_not_found() {
        let clouds = to_yaml(
            r#"clouds:
  cloud_name:
    auth_type: password
    auth:
      auth_url: http://url1
      username: user1
      password: password1
    cacert: /I/do/not/exist"#,
        );

        let cfg = from_files(
            "cloud_name",
            clouds,
            with_one_key("public-clouds"),
            with_one_key("clouds"),
        )
        .unwrap();
        let e = cfg.create_client().err().unwrap();
        if cfg!(any(feature = "native-tls", feature = "rustls")) {
            assert!(e.to_string().contains("Cannot open cacert file"));
        } else {
            assert!(e.to_string().contains("TLS support is disabled"));
        }
    }

    #[test]
    fn test_inject_profiles_error() {
        let mut clouds_data = to_yaml(
            r#"
clouds:
  cloud_name:
    auth:
      username: user1
      password: password1
    profile: test_profile"#,
        );

        let mut clouds_public_data = to_yaml(
            r#"
public-clouds:
  test_profile_other:
    auth:
        username: user2
        auth_url: url2
    region_name: region2"#,
        );

        let err = inject_profiles(&mut clouds_public_data, &mut clouds_data).unwrap_err();
        assert_eq!(ErrorKind::InvalidConfig, err.kind());
        assert_eq!("configuration file cannot be found or is invalid: Missing profile test_profile in clouds-public.yaml", err.to_string());
    }

    #[test]
    fn test_inject_profiles_ok() {
        let mut clouds_data = to_yaml(
            r#"
clouds:
  cloud_name:
    auth:
      username: user1
      password: password1
    profile: test_profile"#,
        );

        let mut clouds_public_data = to_yaml(
            r#"
public-clouds:
  test_profile:
    auth:
        username: user2
        auth_url: url2
    region_name: region2
    identity_api_version: 3"#,
        );

        inject_profiles(&mut clouds_public_data, &mut clouds_data).unwrap();

        assert_eq!(Some("region2"), cloud_value(&clouds_data, &["region_name"]).as_str());
        assert_eq!(Some("user1"), cloud_value(&clouds_data, &["auth", "username"]).as_str());
        assert_eq!(Some("password1"), cloud_value(&clouds_data, &["auth", "password"]).as_str());
        assert_eq!(Some("url2"), cloud_value(&clouds_data, &["auth", "auth_url"]).as_str());
        assert_eq!(
            Some(3),
            cloud_value(&clouds_data, &["identity_api_version"]).as_i64()
        );
    }

    #[test]
    fn test_inject_profiles_without_clouds() {
        let mut clouds_data = to_yaml("something: else");
        let err = inject_profiles(&mut with_one_key("public-clouds"), &mut clouds_data)
            .unwrap_err();
        assert_eq!(ErrorKind::InvalidConfig, err.kind());
    }

    #[test]
    fn test_read_config_file_error() {
        let e = read_yaml("doesnt_exist", None).err().unwrap();
        assert_eq!("configuration file cannot be found or is invalid: doesnt_exist was not found in any location", e.to_string());
    }

    #[test]
    fn test_read_config_file_default() {
        let mapping = read_yaml("doesnt_exist", Some("clouds")).unwrap();
        assert_eq!(mapping, with_one_key("clouds"));
    }

    #[test]
    fn test_find_config_fail() {
        let config = find_config("shouldnt_exist");
        assert_eq!(config, None);
    }
}
