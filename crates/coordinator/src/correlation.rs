//! Fixed correlation codes tying host events back to a request kind.
//!
//! Each kind owns one launch code and one permission code. Codes outside
//! this table belong to someone else and are left unhandled.

use crate::types::RequestKind;

pub const PICK_IMAGE: u32 = 2342;
pub const CAPTURE_IMAGE: u32 = 2343;
pub const PICK_VIDEO: u32 = 2352;
pub const CAPTURE_VIDEO: u32 = 2353;

pub const PHOTO_FOR_IMAGE_PERMISSION: u32 = 2344;
pub const CAMERA_FOR_IMAGE_PERMISSION: u32 = 2345;
pub const PHOTO_FOR_VIDEO_PERMISSION: u32 = 2354;
pub const CAMERA_FOR_VIDEO_PERMISSION: u32 = 2355;

/// Which phase of which kind a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    Launch(RequestKind),
    Permission(RequestKind),
}

pub fn launch_code(kind: RequestKind) -> u32 {
    match kind {
        RequestKind::PickImage => PICK_IMAGE,
        RequestKind::CaptureImage => CAPTURE_IMAGE,
        RequestKind::PickVideo => PICK_VIDEO,
        RequestKind::CaptureVideo => CAPTURE_VIDEO,
    }
}

pub fn permission_code(kind: RequestKind) -> u32 {
    match kind {
        RequestKind::PickImage => PHOTO_FOR_IMAGE_PERMISSION,
        RequestKind::CaptureImage => CAMERA_FOR_IMAGE_PERMISSION,
        RequestKind::PickVideo => PHOTO_FOR_VIDEO_PERMISSION,
        RequestKind::CaptureVideo => CAMERA_FOR_VIDEO_PERMISSION,
    }
}

pub fn classify(code: u32) -> Option<Correlation> {
    RequestKind::ALL.into_iter().find_map(|kind| {
        if code == launch_code(kind) {
            Some(Correlation::Launch(kind))
        } else if code == permission_code(kind) {
            Some(Correlation::Permission(kind))
        } else {
            None
        }
    })
}
