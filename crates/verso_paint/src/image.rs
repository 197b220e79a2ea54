//! Decoded image handles
//!
//! Decoding and upload happen outside the renderer. An [`Image`] only carries
//! the identity of an already uploaded texture plus its pixel size; cloning
//! shares the handle.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use verso_core::Rect;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an uploaded texture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(u64);

impl ImageId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct ImageInner {
    id: ImageId,
    width: u32,
    height: u32,
    dynamic: bool,
}

/// Shared handle to an uploaded texture
#[derive(Clone, Debug)]
pub struct Image {
    inner: Rc<ImageInner>,
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Image {
    /// Static image of `width × height` pixels
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_dynamic(width, height, false)
    }

    /// Image whose contents change between frames (video, render textures)
    pub fn dynamic(width: u32, height: u32) -> Self {
        Self::with_dynamic(width, height, true)
    }

    fn with_dynamic(width: u32, height: u32, dynamic: bool) -> Self {
        let id = ImageId(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            inner: Rc::new(ImageInner {
                id,
                width,
                height,
                dynamic,
            }),
        }
    }

    pub fn id(&self) -> ImageId {
        self.inner.id
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    pub fn is_dynamic(&self) -> bool {
        self.inner.dynamic
    }

    /// Zero-sized images are skipped when drawing
    pub fn is_valid(&self) -> bool {
        self.inner.width > 0 && self.inner.height > 0
    }

    /// Full image rect in pixels
    pub fn bounds(&self) -> Rect {
        Rect::from_ltwh(0.0, 0.0, self.width() as f32, self.height() as f32)
    }
}
