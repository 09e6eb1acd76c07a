use axum::body::Bytes;
use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::AppError;

use super::adapter::RenderOutput;

/// 引擎输出（base64 文本）→ 图像原始字节
pub fn decode(output: &RenderOutput) -> Result<Bytes, AppError> {
    let bytes = STANDARD.decode(output.as_str().trim_ascii())?;
    if bytes.is_empty() {
        return Err(AppError::Decode("引擎输出为空".to_string()));
    }
    Ok(Bytes::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_output_decodes_exactly() {
        let raw = b"GIF89a\x01\x00\x01\x00";
        let out = RenderOutput::new(STANDARD.encode(raw));
        assert_eq!(decode(&out).expect("decode").as_ref(), raw);
    }

    #[test]
    fn malformed_output_is_a_decode_failure() {
        for bad in ["R0lGOD", "R0lG*DlhAQ==", "R0lGODlhAQ===", "====", ""] {
            let err = decode(&RenderOutput::new(bad)).unwrap_err();
            assert!(matches!(err, AppError::Decode(_)), "{bad:?} -> {err}");
        }
    }
}
