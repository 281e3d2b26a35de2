//! Error types for stock identifier resolution
//!
//! Resolution failures are part of the engine's contract with end users:
//! every variant renders to a Chinese display string that is stored in
//! `ExtractedParams.error` and eventually shown verbatim.

use thiserror::Error;

/// Why a token could not be resolved to a listed stock
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Code-shaped token with no exchange suffix ("600519.")
    #[error("证券代码格式错误：缺少后缀，应添加.SZ/.SH/.BJ")]
    MissingSuffix,

    /// Suffix is not one of SZ/SH/BJ ("600519.XX")
    #[error("证券代码格式错误：后缀'{suffix}'不正确，应为.SZ/.SH/.BJ")]
    InvalidSuffix { suffix: String },

    /// Suffix is correct except for letter case ("600519.sh")
    #[error("证券代码后缀大小写错误，应为{expected}")]
    InvalidCase { expected: String },

    /// Numeric part is not exactly six digits
    #[error("股票代码应为6位数字，您输入了{len}位")]
    InvalidLength { len: usize },

    /// Well-formed code that is not in the reference table
    #[error("股票代码{ts_code}不存在，请检查是否输入正确")]
    NotListed { ts_code: String },

    /// Recognized shorthand; the caller must spell out the full name
    #[error("请使用完整公司名称，如：{full_name}")]
    UseFullName { full_name: String },

    /// Nothing in the input looks like a stock identifier
    #[error(
        "无法识别输入内容。请输入：1) 6位股票代码（如002047）2) 证券代码（如600519.SH）3) 股票名称（如贵州茅台）"
    )]
    Unrecognized,

    /// Empty or whitespace-only input
    #[error("查询内容不能为空")]
    Empty,
}

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResolveError::InvalidLength { len: 5 };
        assert_eq!(err.to_string(), "股票代码应为6位数字，您输入了5位");

        let err = ResolveError::NotListed {
            ts_code: "999999.SH".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "股票代码999999.SH不存在，请检查是否输入正确"
        );

        let err = ResolveError::InvalidCase {
            expected: ".SH".to_string(),
        };
        assert_eq!(err.to_string(), "证券代码后缀大小写错误，应为.SH");
    }

    #[test]
    fn test_suffix_errors() {
        assert_eq!(
            ResolveError::MissingSuffix.to_string(),
            "证券代码格式错误：缺少后缀，应添加.SZ/.SH/.BJ"
        );
        let err = ResolveError::InvalidSuffix {
            suffix: "XX".to_string(),
        };
        assert!(err.to_string().contains("后缀'XX'不正确"));
    }
}
