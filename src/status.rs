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

//! Resource statuses.

use std::fmt::Debug;

use crate::protocol_enum;

/// A status of a resource that can be waited for.
///
/// Every status enumeration designates one value as its error state. A value designating a
/// deleted resource is optional, many services simply return HTTP 404 for deleted resources.
pub trait ResourceStatus: Debug + Copy + PartialEq + Send {
    /// Whether the resource is in its error state.
    fn is_error(&self) -> bool;

    /// Whether the resource is deleted.
    fn is_deleted(&self) -> bool {
        false
    }
}

protocol_enum! {
    #[doc = "Possible image statuses in the Image service (Glance) API."]
    #[non_exhaustive]
    enum ImageStatus = Unknown {
        Queued = "queued",
        Saving = "saving",
        Uploading = "uploading",
        Importing = "importing",
        Active = "active",
        Killed = "killed",
        Deleted = "deleted",
        PendingDelete = "pending_delete",
        Deactivated = "deactivated",
        Unknown = "unknown"
    }
}

impl ResourceStatus for ImageStatus {
    fn is_error(&self) -> bool {
        *self == ImageStatus::Killed
    }

    fn is_deleted(&self) -> bool {
        *self == ImageStatus::Deleted
    }
}

protocol_enum! {
    #[doc = "Possible image statuses as reported by the Compute API (`/images` proxy)."]
    #[non_exhaustive]
    enum ComputeImageStatus = Unknown {
        Active = "ACTIVE",
        Saving = "SAVING",
        Error = "ERROR",
        Deleted = "DELETED",
        Unknown = "UNKNOWN"
    }
}

impl ResourceStatus for ComputeImageStatus {
    fn is_error(&self) -> bool {
        *self == ComputeImageStatus::Error
    }

    fn is_deleted(&self) -> bool {
        *self == ComputeImageStatus::Deleted
    }
}

protocol_enum! {
    #[doc = "Possible server statuses."]
    #[non_exhaustive]
    enum ServerStatus = Unknown {
        Active = "ACTIVE",
        Building = "BUILD",
        Deleted = "DELETED",
        Error = "ERROR",
        HardRebooting = "HARD_REBOOT",
        Migrating = "MIGRATING",
        Paused = "PAUSED",
        Rebooting = "REBOOT",
        Resizing = "RESIZE",
        RevertingResize = "REVERT_RESIZE",
        ShutOff = "SHUTOFF",
        Suspended = "SUSPENDED",
        Rescuing = "RESCUE",
        Shelved = "SHELVED",
        ShelvedOffloaded = "SHELVED_OFFLOADED",
        SoftDeleted = "SOFT_DELETED",
        Unknown = "UNKNOWN",
        UpdatingPassword = "PASSWORD",
        VerifyingResize = "VERIFY_RESIZE"
    }
}

impl ResourceStatus for ServerStatus {
    fn is_error(&self) -> bool {
        *self == ServerStatus::Error
    }

    fn is_deleted(&self) -> bool {
        *self == ServerStatus::Deleted
    }
}

protocol_enum! {
    #[doc = "Possible volume statuses."]
    #[non_exhaustive]
    enum VolumeStatus = Unknown {
        Creating = "creating",
        Available = "available",
        Reserved = "reserved",
        Attaching = "attaching",
        Detaching = "detaching",
        InUse = "in-use",
        Maintenance = "maintenance",
        Deleting = "deleting",
        AwaitingTransfer = "awaiting-transfer",
        Error = "error",
        ErrorDeleting = "error_deleting",
        BackingUp = "backing-up",
        RestoringBackup = "restoring-backup",
        ErrorBackingUp = "error_backing-up",
        ErrorRestoring = "error_restoring",
        ErrorExtending = "error_extending",
        Downloading = "downloading",
        Uploading = "uploading",
        Retyping = "retyping",
        Extending = "extending",
        Unknown = "unknown"
    }
}

impl ResourceStatus for VolumeStatus {
    fn is_error(&self) -> bool {
        matches!(
            self,
            VolumeStatus::Error
                | VolumeStatus::ErrorDeleting
                | VolumeStatus::ErrorBackingUp
                | VolumeStatus::ErrorRestoring
                | VolumeStatus::ErrorExtending
        )
    }
}

protocol_enum! {
    #[doc = "Possible statuses of an external server event."]
    #[non_exhaustive]
    enum ServerEventStatus = Unknown {
        Completed = "completed",
        Failed = "failed",
        InProgress = "in-progress",
        Unknown = "unknown"
    }
}

impl ResourceStatus for ServerEventStatus {
    fn is_error(&self) -> bool {
        *self == ServerEventStatus::Failed
    }
}
