use ddsfile::{D3DFormat, DxgiFormat, FourCC};
use thiserror::Error;

use crate::{CompressionFormat, Compressor, EncodeSettings, SurfaceError, SurfaceRgba32Float};

#[derive(Debug, Error)]
pub enum CreateDdsError {
    #[error("error creating DDS")]
    Dds(#[from] ddsfile::Error),

    #[error("error compressing surface")]
    CompressSurface(#[from] SurfaceError),
}

/// Compress `image` to a DDS file with the settings in `settings`.
#[cfg(feature = "image")]
pub fn dds_from_image(
    image: &image::RgbaImage,
    settings: &EncodeSettings,
) -> Result<ddsfile::Dds, CreateDdsError> {
    let surface = crate::SurfaceRgba8::from(image).to_rgbaf32()?;
    dds_from_surface(&Compressor::new(), &surface, settings)
}

/// Compress `surface` to a 2D DDS file with a single mip level.
pub fn dds_from_surface<T: AsRef<[f32]>>(
    compressor: &Compressor,
    surface: &SurfaceRgba32Float<T>,
    settings: &EncodeSettings,
) -> Result<ddsfile::Dds, CreateDdsError> {
    let data = compressor.compress(surface, settings)?;

    let mut dds = ddsfile::Dds::new_dxgi(ddsfile::NewDxgiParams {
        height: surface.height,
        width: surface.width,
        depth: None,
        format: settings.format.into(),
        mipmap_levels: None,
        array_layers: None,
        caps2: None,
        is_cubemap: false,
        resource_dimension: ddsfile::D3D10ResourceDimension::Texture2D,
        alpha_mode: ddsfile::AlphaMode::Straight,
    })?;

    dds.data = data;

    Ok(dds)
}

/// The block compressed format of `dds` or `None` if the format isn't supported.
pub fn dds_compression_format(dds: &ddsfile::Dds) -> Option<CompressionFormat> {
    // The format can be DXGI, D3D, or specified in the FOURCC.
    let dxgi = dds.get_dxgi_format();
    let d3d = dds.get_d3d_format();
    let fourcc = dds.header.spf.fourcc.as_ref();

    dxgi.and_then(format_from_dxgi)
        .or_else(|| d3d.and_then(format_from_d3d))
        .or_else(|| fourcc.and_then(format_from_fourcc))
}

fn format_from_dxgi(format: DxgiFormat) -> Option<CompressionFormat> {
    match format {
        DxgiFormat::BC1_UNorm | DxgiFormat::BC1_UNorm_sRGB => Some(CompressionFormat::Bc1),
        DxgiFormat::BC2_UNorm | DxgiFormat::BC2_UNorm_sRGB => Some(CompressionFormat::Bc2),
        DxgiFormat::BC3_UNorm | DxgiFormat::BC3_UNorm_sRGB => Some(CompressionFormat::Bc3),
        DxgiFormat::BC4_UNorm => Some(CompressionFormat::Bc4),
        DxgiFormat::BC5_UNorm => Some(CompressionFormat::Bc5),
        _ => None,
    }
}

fn format_from_d3d(format: D3DFormat) -> Option<CompressionFormat> {
    match format {
        D3DFormat::DXT1 => Some(CompressionFormat::Bc1),
        D3DFormat::DXT2 | D3DFormat::DXT3 => Some(CompressionFormat::Bc2),
        D3DFormat::DXT4 | D3DFormat::DXT5 => Some(CompressionFormat::Bc3),
        _ => None,
    }
}

const BC5U: u32 = u32::from_le_bytes(*b"BC5U");
const ATI2: u32 = u32::from_le_bytes(*b"ATI2");

fn format_from_fourcc(fourcc: &FourCC) -> Option<CompressionFormat> {
    match fourcc.0 {
        FourCC::DXT1 => Some(CompressionFormat::Bc1),
        FourCC::DXT2 | FourCC::DXT3 => Some(CompressionFormat::Bc2),
        FourCC::DXT4 | FourCC::DXT5 => Some(CompressionFormat::Bc3),
        FourCC::BC4_UNORM => Some(CompressionFormat::Bc4),
        ATI2 | BC5U => Some(CompressionFormat::Bc5),
        _ => None,
    }
}

impl From<CompressionFormat> for DxgiFormat {
    fn from(value: CompressionFormat) -> Self {
        match value {
            CompressionFormat::Bc1 => Self::BC1_UNorm,
            CompressionFormat::Bc2 => Self::BC2_UNorm,
            CompressionFormat::Bc3 => Self::BC3_UNorm,
            CompressionFormat::Bc4 => Self::BC4_UNorm,
            CompressionFormat::Bc5 => Self::BC5_UNorm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case(CompressionFormat::Bc1)]
    #[case(CompressionFormat::Bc2)]
    #[case(CompressionFormat::Bc3)]
    #[case(CompressionFormat::Bc4)]
    #[case(CompressionFormat::Bc5)]
    fn dds_from_surface_format(#[case] format: CompressionFormat) {
        let surface = SurfaceRgba32Float {
            width: 8,
            height: 4,
            pitch: 8,
            data: vec![0.5f32; 8 * 4 * 4],
        };
        let dds = dds_from_surface(&Compressor::new(), &surface, &EncodeSettings::new(format))
            .unwrap();

        assert_eq!(8, dds.get_width());
        assert_eq!(4, dds.get_height());
        assert_eq!(Some(format), dds_compression_format(&dds));
        assert_eq!(2 * format.block_size_in_bytes(), dds.data.len());
    }

    #[test]
    fn dds_from_surface_invalid() {
        let surface = SurfaceRgba32Float {
            width: 0,
            height: 4,
            pitch: 0,
            data: Vec::<f32>::new(),
        };
        let result = dds_from_surface(
            &Compressor::new(),
            &surface,
            &EncodeSettings::new(CompressionFormat::Bc1),
        );
        assert!(matches!(
            result,
            Err(CreateDdsError::CompressSurface(
                SurfaceError::ZeroSizedSurface { .. }
            ))
        ));
    }

    #[test]
    fn fourcc_formats() {
        assert_eq!(
            Some(CompressionFormat::Bc5),
            format_from_fourcc(&FourCC(ATI2))
        );
        assert_eq!(
            Some(CompressionFormat::Bc1),
            format_from_fourcc(&FourCC(FourCC::DXT1))
        );
        assert_eq!(None, format_from_fourcc(&FourCC(0)));
    }
}
