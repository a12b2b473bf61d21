//! Texture images and their GPU counterparts
//!
//! [`TextureImage`] is CPU-side RGBA8 pixel data, either decoded from a PNG
//! file or generated procedurally. [`TextureResource`] bundles the wgpu
//! texture, view and sampler created from it.

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("cannot read texture \"{path}\": {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// RGBA8 pixels, rows top to bottom
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// Decodes a PNG (or any format `image` can guess) into RGBA8
    pub fn load(path: &Path) -> Result<Self, TextureError> {
        let decoded = image::ImageReader::open(path)
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.with_guessed_format().map_err(image::ImageError::IoError))
            .and_then(|reader| reader.decode())
            .map_err(|source| TextureError::Decode {
                path: path.display().to_string(),
                source,
            })?
            .to_rgba8();

        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            rgba: decoded.into_raw(),
        })
    }

    /// A single opaque white texel, bound for untextured draws
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        }
    }

    /// Radial glow for the light-source billboard
    ///
    /// Opaque inside `inner_radius`, fading as `rel^3.5` to fully
    /// transparent at `outer_radius`. The green channel brightens near the
    /// opaque disc so the rim reads hotter than the halo.
    pub fn sun_glow(size: u32, inner_radius: f32, outer_radius: f32) -> Self {
        const ATTENUATION: f32 = 3.5;
        let center = size as f32 / 2.0;
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                let distance = (dx * dx + dy * dy).sqrt();

                let (green, alpha) = if distance < inner_radius {
                    (110.0, 1.0)
                } else if distance < outer_radius {
                    let relative = (outer_radius - distance) / (outer_radius - inner_radius);
                    let alpha = relative.powf(ATTENUATION);
                    ((200.0 * alpha).max(120.0), alpha)
                } else {
                    (110.0, 0.0)
                };

                rgba.extend_from_slice(&[255, green as u8, 50, (255.0 * alpha) as u8]);
            }
        }

        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    /// Pixel at `(x, y)` as `[r, g, b, a]`
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let index = ((y * self.width + x) * 4) as usize;
        [
            self.rgba[index],
            self.rgba[index + 1],
            self.rgba[index + 2],
            self.rgba[index + 3],
        ]
    }
}

/// GPU texture resource containing texture, view, and sampler
#[derive(Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    /// Standard depth buffer format
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Creates a depth texture matching the surface configuration
    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads an RGBA8 image with linear filtering
    ///
    /// Wraps horizontally so sphere seams stay continuous; clamps vertically
    /// so the poles do not bleed into each other.
    pub fn create_from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &TextureImage,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sun_glow_is_opaque_at_center_and_clear_at_border() {
        let glow = TextureImage::sun_glow(900, 150.0, 450.0);

        assert_eq!(glow.rgba.len(), 900 * 900 * 4);
        assert_eq!(glow.pixel(450, 450), [255, 110, 50, 255]);
        assert_eq!(glow.pixel(0, 0)[3], 0);
        assert_eq!(glow.pixel(450, 0)[3], 0);
        assert_eq!(glow.pixel(899, 450)[3], 0);
    }

    #[test]
    fn test_sun_glow_fades_monotonically() {
        let glow = TextureImage::sun_glow(900, 150.0, 450.0);
        let alphas: Vec<u8> = (450..900).map(|x| glow.pixel(x, 450)[3]).collect();

        assert!(alphas.windows(2).all(|pair| pair[0] >= pair[1]));
        // Just outside the opaque disc the rim is brightened
        let rim = glow.pixel(450 + 151, 450);
        assert!(rim[1] >= 120);
        assert!(rim[3] > 0 && rim[3] < 255);
    }

    #[test]
    fn test_missing_png_is_an_error() {
        let result = TextureImage::load(Path::new("definitely/not/here.png"));
        assert!(matches!(result, Err(TextureError::Decode { .. })));
    }

    #[test]
    fn test_white_is_single_opaque_texel() {
        let white = TextureImage::white();
        assert_eq!((white.width, white.height), (1, 1));
        assert_eq!(white.pixel(0, 0), [255, 255, 255, 255]);
    }
}
