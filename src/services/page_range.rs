//! 页码范围解析 - 业务能力层
//!
//! 把 `"1-3, 5, 8-9"` 这样的范围描述解析为升序、去重的页码列表（从 1 开始）。
//!
//! 语法：逗号分隔的片段，每个片段是正整数或 `start-end`；片段两端空白会被去掉，
//! 空片段直接跳过，空字符串得到空结果（由调用方决定空结果是否代表“全部页”）。
//!
//! ## 宽松模式
//!
//! `total_pages` 为 `None` 时完全跳过越界检查，只拒绝格式错误的片段。
//! 在切片服务读取源文件之前页数还不知道，此时由服务端负责越界校验。
//! 片段先合并为区间再展开，展开后的页数不得超过 [`MAX_SELECTED_PAGES`]。

use std::ops::RangeInclusive;

use crate::error::{RangeError, RangeErrorReason};

/// 一次选择最多展开的页数
///
/// 宽松模式下 `1-4294967295` 这样的片段格式合法，超过上限时按 `TooManyPages` 拒绝，
/// 不会真正展开。
pub const MAX_SELECTED_PAGES: u32 = 10_000;

/// 页码范围解析器
pub struct PageRangeParser;

impl PageRangeParser {
    /// 解析页码范围
    ///
    /// # 参数
    /// - `spec`: 范围描述
    /// - `total_pages`: 总页数，未知时传 `None`（宽松模式）
    ///
    /// # 返回
    /// 所有片段的并集，去重并升序排列
    pub fn parse(spec: &str, total_pages: Option<u32>) -> Result<Vec<u32>, RangeError> {
        let mut ranges: Vec<(RangeInclusive<u32>, &str)> = Vec::new();

        for raw in spec.split(',') {
            let token = raw.trim();
            if token.is_empty() {
                continue;
            }

            let range = match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page(token, start)?;
                    let end = parse_page(token, end)?;
                    if start > end {
                        return Err(RangeError::new(token, RangeErrorReason::StartAfterEnd));
                    }
                    start..=end
                }
                None => {
                    let page = parse_page(token, token)?;
                    page..=page
                }
            };
            check_bounds(token, *range.end(), total_pages)?;
            ranges.push((range, token));
        }

        let merged = merge(&ranges);
        let count: u64 = merged.iter().map(span).sum();
        if count > u64::from(MAX_SELECTED_PAGES) {
            // 报告跨度最大的片段
            let token = ranges
                .iter()
                .max_by_key(|(range, _)| span(range))
                .map(|(_, token)| *token)
                .unwrap_or(spec);
            return Err(RangeError::new(
                token,
                RangeErrorReason::TooManyPages {
                    limit: MAX_SELECTED_PAGES,
                },
            ));
        }

        Ok(merged.into_iter().flatten().collect())
    }

    /// 把页码列表压缩回范围描述，例如 `[1,2,3,5]` → `"1-3,5"`
    pub fn format(pages: &[u32]) -> String {
        let mut sorted: Vec<u32> = pages.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut parts = Vec::new();
        let mut iter = sorted.into_iter().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while let Some(next) = end.checked_add(1) {
                if iter.peek() != Some(&next) {
                    break;
                }
                end = next;
                iter.next();
            }
            if start == end {
                parts.push(start.to_string());
            } else {
                parts.push(format!("{}-{}", start, end));
            }
        }
        parts.join(",")
    }
}

/// 合并重叠或相邻的区间，结果按起点升序
fn merge(ranges: &[(RangeInclusive<u32>, &str)]) -> Vec<RangeInclusive<u32>> {
    let mut sorted: Vec<RangeInclusive<u32>> = ranges.iter().map(|(range, _)| range.clone()).collect();
    sorted.sort_unstable_by_key(|range| *range.start());

    let mut merged: Vec<RangeInclusive<u32>> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if u64::from(*range.start()) <= u64::from(*last.end()) + 1 => {
                if range.end() > last.end() {
                    *last = *last.start()..=*range.end();
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

fn span(range: &RangeInclusive<u32>) -> u64 {
    u64::from(*range.end()) - u64::from(*range.start()) + 1
}

fn parse_page(token: &str, part: &str) -> Result<u32, RangeError> {
    match part.trim().parse::<u32>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(RangeError::new(token, RangeErrorReason::InvalidPageNumber)),
    }
}

fn check_bounds(token: &str, page: u32, total_pages: Option<u32>) -> Result<(), RangeError> {
    match total_pages {
        Some(total) if page > total => Err(RangeError::new(
            token,
            RangeErrorReason::OutsideBounds { total },
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_union_is_sorted_and_deduplicated() {
        assert_eq!(PageRangeParser::parse("3,1-2,2", Some(5)).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            PageRangeParser::parse("8-9, 1 ,3-4,4", Some(10)).unwrap(),
            vec![1, 3, 4, 8, 9]
        );
    }

    #[test]
    fn test_empty_tokens_are_skipped() {
        assert_eq!(PageRangeParser::parse("", Some(3)).unwrap(), Vec::<u32>::new());
        assert_eq!(PageRangeParser::parse(" , ,", None).unwrap(), Vec::<u32>::new());
        assert_eq!(PageRangeParser::parse("1,,2", Some(3)).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_spaces_around_range_bounds() {
        assert_eq!(PageRangeParser::parse(" 2 - 4 ", Some(4)).unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn test_invalid_page_numbers() {
        for spec in ["0", "abc", "-3", "3-", "1-x", "1.5", "2--4"] {
            let err = PageRangeParser::parse(spec, Some(10)).unwrap_err();
            assert_eq!(err.reason, RangeErrorReason::InvalidPageNumber, "spec: {}", spec);
        }
    }

    #[test]
    fn test_start_after_end() {
        let err = PageRangeParser::parse("1, 5-2", Some(10)).unwrap_err();
        assert_eq!(err.token, "5-2");
        assert_eq!(err.reason, RangeErrorReason::StartAfterEnd);
    }

    #[test]
    fn test_out_of_bounds_names_token() {
        let err = PageRangeParser::parse("1,6", Some(5)).unwrap_err();
        assert_eq!(err.token, "6");
        assert_eq!(err.reason, RangeErrorReason::OutsideBounds { total: 5 });

        let err = PageRangeParser::parse("4-6", Some(5)).unwrap_err();
        assert_eq!(err.token, "4-6");

        assert_ok!(PageRangeParser::parse("5", Some(5)));
        assert_err!(PageRangeParser::parse("0", Some(5)));
    }

    #[test]
    fn test_unknown_total_skips_bounds() {
        assert_eq!(
            PageRangeParser::parse("100, 7-8", None).unwrap(),
            vec![7, 8, 100]
        );
        assert_err!(PageRangeParser::parse("x", None));
        assert_err!(PageRangeParser::parse("0", None));
    }

    #[test]
    fn test_format_compresses_runs() {
        assert_eq!(PageRangeParser::format(&[5, 1, 2, 3, 3, 9, 10]), "1-3,5,9-10");
        assert_eq!(PageRangeParser::format(&[]), "");
    }

    #[test]
    fn test_format_handles_last_page_number() {
        assert_eq!(
            PageRangeParser::format(&[u32::MAX - 1, u32::MAX]),
            format!("{}-{}", u32::MAX - 1, u32::MAX)
        );
        let pages = PageRangeParser::parse("4294967295", None).unwrap();
        assert_eq!(PageRangeParser::format(&pages), "4294967295");
    }

    #[test]
    fn test_huge_relaxed_range_is_rejected_without_expanding() {
        let err = PageRangeParser::parse("2, 1-4294967295", None).unwrap_err();
        assert_eq!(err.token, "1-4294967295");
        assert_eq!(
            err.reason,
            RangeErrorReason::TooManyPages {
                limit: MAX_SELECTED_PAGES
            }
        );

        let last = MAX_SELECTED_PAGES.to_string();
        let pages = PageRangeParser::parse(&format!("1-{}", last), None).unwrap();
        assert_eq!(pages.len(), MAX_SELECTED_PAGES as usize);
        assert_err!(PageRangeParser::parse(&format!("1-{}, {}", last, MAX_SELECTED_PAGES + 1), None));
    }

    #[test]
    fn test_overlapping_ranges_count_once() {
        let spec = format!("1-{}, 1-{}", MAX_SELECTED_PAGES, MAX_SELECTED_PAGES);
        assert_eq!(
            PageRangeParser::parse(&spec, None).unwrap().len(),
            MAX_SELECTED_PAGES as usize
        );
        assert_eq!(PageRangeParser::parse("4-6, 1-3", Some(6)).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }
}
