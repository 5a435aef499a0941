/// Image format sniffing
///
/// Sticker files are named by opaque ids, so the format comes from the
/// leading magic bytes (`image::guess_format`). The file name is only
/// consulted when the content is not recognized.
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Enough leading bytes for every signature `image` knows about
const SNIFF_LEN: usize = 16;

/// Closed set of formats the provider knows how to label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Tiff,
    Undefined,
}

impl From<image::ImageFormat> for ImageFormat {
    fn from(format: image::ImageFormat) -> Self {
        match format {
            image::ImageFormat::Png => ImageFormat::Png,
            image::ImageFormat::Jpeg => ImageFormat::Jpeg,
            image::ImageFormat::Gif => ImageFormat::Gif,
            image::ImageFormat::WebP => ImageFormat::Webp,
            image::ImageFormat::Bmp => ImageFormat::Bmp,
            image::ImageFormat::Tiff => ImageFormat::Tiff,
            _ => ImageFormat::Undefined,
        }
    }
}

impl ImageFormat {
    fn as_image_format(self) -> Option<image::ImageFormat> {
        match self {
            ImageFormat::Png => Some(image::ImageFormat::Png),
            ImageFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageFormat::Gif => Some(image::ImageFormat::Gif),
            ImageFormat::Webp => Some(image::ImageFormat::WebP),
            ImageFormat::Bmp => Some(image::ImageFormat::Bmp),
            ImageFormat::Tiff => Some(image::ImageFormat::Tiff),
            ImageFormat::Undefined => None,
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        self.as_image_format()
            .map(|format| format.to_mime_type())
            .unwrap_or("image/*")
    }

    /// Short suffix appended to display names, empty when unknown
    pub fn suffix(self) -> &'static str {
        match self {
            ImageFormat::Png => ".png",
            ImageFormat::Jpeg => ".jpg",
            ImageFormat::Gif => ".gif",
            ImageFormat::Webp => ".webp",
            ImageFormat::Bmp => ".bmp",
            ImageFormat::Tiff => ".tiff",
            ImageFormat::Undefined => "",
        }
    }

    pub fn from_mime_type(mime_type: &str) -> Self {
        image::ImageFormat::from_mime_type(mime_type.trim().to_ascii_lowercase())
            .map(ImageFormat::from)
            .unwrap_or(ImageFormat::Undefined)
    }

    /// Recognize a format from the first bytes of a file.
    ///
    /// `None` when the bytes match no known image signature; formats `image`
    /// recognizes outside this set come back as `Undefined`.
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        image::guess_format(header).ok().map(ImageFormat::from)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Sniff the format of a stream, using `file_name` as a hint when the bytes are not recognized
pub fn check<R: Read>(mut reader: R, file_name: &str) -> std::io::Result<ImageFormat> {
    let mut header = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = reader.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    if let Some(format) = ImageFormat::from_magic(&header[..filled]) {
        return Ok(format);
    }

    Ok(Path::new(file_name)
        .extension()
        .and_then(image::ImageFormat::from_extension)
        .map(ImageFormat::from)
        .unwrap_or(ImageFormat::Undefined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_magic_bytes() {
        let cases: [(&[u8], ImageFormat); 6] = [
            (b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR", ImageFormat::Png),
            (b"\xff\xd8\xff\xe0\0\x10JFIF", ImageFormat::Jpeg),
            (b"GIF89a\x01\0\x01\0", ImageFormat::Gif),
            (b"RIFF\x24\0\0\0WEBPVP8 ", ImageFormat::Webp),
            (b"BM\x36\0\0\0", ImageFormat::Bmp),
            (b"hello world!", ImageFormat::Undefined),
        ];
        for (bytes, expected) in cases {
            assert_eq!(check(Cursor::new(bytes), "3f2a").unwrap(), expected);
        }
    }

    #[test]
    fn test_content_wins_over_extension() {
        let png = b"\x89PNG\r\n\x1a\n".to_vec();
        assert_eq!(check(Cursor::new(png), "sticker.gif").unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_extension_only_when_content_unknown() {
        assert_eq!(check(Cursor::new(b"??"), "a.webp").unwrap(), ImageFormat::Webp);
        assert_eq!(check(Cursor::new(b""), "no-extension").unwrap(), ImageFormat::Undefined);
    }

    #[test]
    fn test_riff_without_webp_is_unknown() {
        assert_eq!(
            check(Cursor::new(b"RIFF\0\0\0\0WAVEfmt "), "x").unwrap(),
            ImageFormat::Undefined
        );
    }

    #[test]
    fn test_tiff_is_labelled_like_it_decodes() {
        let mut bytes = Vec::new();
        image::RgbaImage::new(4, 4)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Tiff)
            .unwrap();

        let format = check(bytes.as_slice(), "3f2a").unwrap();
        assert_eq!(format, ImageFormat::Tiff);
        assert_eq!(format.to_mime_type(), "image/tiff");
        assert_eq!(format.suffix(), ".tiff");
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[test]
    fn test_known_content_outside_the_set_ignores_extension() {
        // ICO header: recognized, but not a sticker format
        let ico = b"\0\0\x01\0\x01\0\x10\x10".to_vec();
        assert_eq!(check(Cursor::new(ico), "sticker.png").unwrap(), ImageFormat::Undefined);
    }

    #[test]
    fn test_mime_and_suffix() {
        assert_eq!(ImageFormat::Jpeg.to_mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::from_mime_type("IMAGE/JPEG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_mime_type("vnd.android.document/directory"), ImageFormat::Undefined);
        assert_eq!(ImageFormat::Undefined.to_mime_type(), "image/*");
        assert_eq!(ImageFormat::Gif.to_string(), ".gif");
        assert_eq!(ImageFormat::Undefined.to_string(), "");
    }
}
