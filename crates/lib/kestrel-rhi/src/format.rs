use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Unknown,

    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8Srgb,
    Bgra8Unorm,
    Bgra8Srgb,

    R16Float,
    Rg16Float,
    Rgba16Float,

    R32Uint,
    R32Float,
    Rg32Float,
    Rgba32Float,

    D16Unorm,
    D32Float,
    D24UnormS8Uint,
    D32FloatS8Uint,
    S8Uint,
}

impl PixelFormat {
    pub fn has_depth(self) -> bool {
        matches!(
            self,
            PixelFormat::D16Unorm
                | PixelFormat::D32Float
                | PixelFormat::D24UnormS8Uint
                | PixelFormat::D32FloatS8Uint
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            PixelFormat::D24UnormS8Uint | PixelFormat::D32FloatS8Uint | PixelFormat::S8Uint
        )
    }

    pub fn is_depth_stencil(self) -> bool {
        self.has_depth() || self.has_stencil()
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        PixelFormat::Unknown
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleCount {
    X1,
    X2,
    X4,
    X8,
}

impl Default for SampleCount {
    fn default() -> Self {
        SampleCount::X1
    }
}
