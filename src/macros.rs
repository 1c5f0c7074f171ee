// Copyright 2022 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Macros for defining resource status enumerations.

/// A macro for defining serializable and deserializable protocol enums.
///
/// `Clone`, `Copy`, `Debug`, `Display`, `Serialize`/`Deserialize` and equality traits are
/// automatically derived. Such enums are suitable as a status for
/// [ResourceStatus](status/trait.ResourceStatus.html) implementations.
///
/// The easiest variant assumes that the carrier type is a string:
///
/// ```rust
/// osclient::protocol_enum! {
///     #[doc = "Possible volume statuses."]
///     enum VolumeStatus {
///         Creating = "creating",
///         Available = "available",
///         InUse = "in-use",
///         Error = "error"
///     }
/// }
///
/// assert_eq!(VolumeStatus::InUse.as_str(), "in-use");
/// ```
///
/// The second variant assumes a non-string carrier type, which must be (de-)serializable:
///
/// ```rust
/// osclient::protocol_enum! {
///     #[doc = "Possible power states."]
///     enum PowerState: u8 {
///         NoState = 0,
///         Running = 1,
///         Paused = 3,
///         Shutdown = 4
///     }
/// }
/// ```
///
/// These two variants produce a failure when an unknown value is deserialized. Services tend
/// to grow new states over time, so a status enum usually provides a default value instead:
///
/// ```rust
/// osclient::protocol_enum! {
///     #[doc = "Possible volume statuses."]
///     #[non_exhaustive]
///     enum VolumeStatus = Unknown {
///         Creating = "creating",
///         Available = "available",
///         Error = "error",
///         Unknown = "unknown"
///     }
/// }
///
/// let status: VolumeStatus = serde_json::from_str("\"reserved\"").unwrap();
/// assert_eq!(status, VolumeStatus::Unknown);
/// ```
#[macro_export]
macro_rules! protocol_enum {
    {$(#[$attr:meta])* enum $name:ident: $carrier:ty {
        $($(#[$iattr:meta])* $item:ident = $val:expr),+
    }} => (
        $crate::protocol_enum! {
            $(#[$attr])*
            __carrier $name: $carrier {
                $($(#[$iattr])* $item = $val),+
            }
        }

        impl<'de> ::serde::de::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
                    where D: ::serde::de::Deserializer<'de> {
                let value: $carrier = ::serde::de::Deserialize::deserialize(deserializer)?;
                match value {
                    $($val => Ok($name::$item)),+,
                    other => Err(<D::Error as ::serde::de::Error>::custom(
                        format!("Unexpected {}: {}", stringify!($name), other)
                    )),
                }
            }
        }
    );

    {$(#[$attr:meta])* enum $name:ident: $carrier:ty = $default:ident {
        $($(#[$iattr:meta])* $item:ident = $val:expr),+
    }} => (
        $crate::protocol_enum! {
            $(#[$attr])*
            __carrier $name: $carrier {
                $($(#[$iattr])* $item = $val),+
            }
        }
        $crate::protocol_enum!(__default $name = $default);

        impl<'de> ::serde::de::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
                    where D: ::serde::de::Deserializer<'de> {
                let value: $carrier = ::serde::de::Deserialize::deserialize(deserializer)?;
                Ok(match value {
                    $($val => $name::$item),+,
                    _ => $name::$default,
                })
            }
        }
    );

    {$(#[$attr:meta])* enum $name:ident {
        $($(#[$iattr:meta])* $item:ident = $val:expr),+
    }} => (
        $crate::protocol_enum! {
            $(#[$attr])*
            __string $name {
                $($(#[$iattr])* $item = $val),+
            }
        }

        impl<'de> ::serde::de::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
                    where D: ::serde::de::Deserializer<'de> {
                let value = <String as ::serde::de::Deserialize>::deserialize(deserializer)?;
                match value.as_str() {
                    $($val => Ok($name::$item)),+,
                    other => Err(<D::Error as ::serde::de::Error>::custom(
                        format!("Unexpected {}: {}", stringify!($name), other)
                    )),
                }
            }
        }
    );

    {$(#[$attr:meta])* enum $name:ident = $default:ident {
        $($(#[$iattr:meta])* $item:ident = $val:expr),+
    }} => (
        $crate::protocol_enum! {
            $(#[$attr])*
            __string $name {
                $($(#[$iattr])* $item = $val),+
            }
        }
        $crate::protocol_enum!(__default $name = $default);

        impl<'de> ::serde::de::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
                    where D: ::serde::de::Deserializer<'de> {
                let value = <String as ::serde::de::Deserialize>::deserialize(deserializer)?;
                Ok(match value.as_str() {
                    $($val => $name::$item),+,
                    _ => $name::$default,
                })
            }
        }
    );

    (__default $name:ident = $default:ident) => (
        impl Default for $name {
            fn default() -> $name {
                $name::$default
            }
        }
    );

    {$(#[$attr:meta])* __string $name:ident {
        $($(#[$iattr:meta])* $item:ident = $val:expr),+
    }} => (
        $(#[$attr])*
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$iattr])* $item),+,
        }

        impl $name {
            /// The value as used by the service.
            pub fn as_str(&self) -> &'static str {
                match *self {
                    $($name::$item => $val),+,
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.as_str().to_string()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::serde::ser::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
                    where S: ::serde::ser::Serializer {
                serializer.serialize_str(self.as_str())
            }
        }
    );

    {$(#[$attr:meta])* __carrier $name:ident: $carrier:ty {
        $($(#[$iattr:meta])* $item:ident = $val:expr),+
    }} => (
        $(#[$attr])*
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$iattr])* $item),+,
        }

        impl From<$name> for $carrier {
            fn from(value: $name) -> $carrier {
                match value {
                    $($name::$item => $val.into()),+,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&<$carrier>::from(*self), f)
            }
        }

        impl ::serde::ser::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
                    where S: ::serde::ser::Serializer {
                ::serde::ser::Serialize::serialize(&<$carrier>::from(*self), serializer)
            }
        }
    );
}
