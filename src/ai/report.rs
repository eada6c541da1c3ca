//! Parsing of the tagged reports returned by the analysis model.

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{Analysis, Counter, Viewpoint};

/// Reply meaning "nothing to report".
pub const FAIL_TOKEN: &str = "IGNORE";

/// Inner text of every `<tag>…</tag>` block, in document order.
fn blocks<'a>(text: &'a str, tag: &str) -> Vec<&'a str> {
    let Ok(re) = Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>")) else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
        .collect()
}

fn first<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    blocks(text, tag).into_iter().next()
}

fn required<'a>(text: &'a str, tag: &str) -> Result<&'a str> {
    first(text, tag).ok_or_else(|| AppError::Report(format!("missing <{tag}>")))
}

fn clean(text: &str) -> String {
    text.trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn arguments(text: &str) -> Vec<String> {
    first(text, "arguments")
        .map(|args| blocks(args, "argument").into_iter().map(clean).collect())
        .unwrap_or_default()
}

/// Parses `<analysis><subject/><view-points>…</view-points></analysis>`.
pub fn parse_analysis(reply: &str) -> Result<Analysis> {
    let report = required(reply, "analysis")?;
    let subject = clean(required(report, "subject")?);
    if subject.is_empty() {
        return Err(AppError::Report("empty <subject>".to_string()));
    }

    let view_points = first(report, "view-points")
        .map(|points| {
            blocks(points, "view-point")
                .into_iter()
                .filter_map(|vp| {
                    let point = clean(first(vp, "point")?);
                    Some(Viewpoint {
                        point,
                        arguments: arguments(vp),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Analysis {
        subject,
        view_points,
    })
}

/// Parses `<rebuttals><rebuttal>…</rebuttal></rebuttals>`.
///
/// The fail token yields no counters. Rebuttals naming an article id that
/// is not a number are skipped.
pub fn parse_counters(reply: &str) -> Result<Vec<Counter>> {
    if reply.trim() == FAIL_TOKEN {
        return Ok(Vec::new());
    }
    let rebuttals = required(reply, "rebuttals")?;

    let counters = blocks(rebuttals, "rebuttal")
        .into_iter()
        .filter_map(|r| {
            let article_id = clean(first(r, "article-id")?);
            let Ok(counter_source_item_uuid) = article_id.parse::<i64>() else {
                tracing::warn!("Skipping rebuttal with article id {:?}", article_id);
                return None;
            };
            Some(Counter {
                counter_source_item_uuid,
                original_view_point: clean(first(r, "original")?),
                counter_view_point: clean(first(r, "counter-point")?),
                arguments: arguments(r),
            })
        })
        .collect();

    Ok(counters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analysis_report_in_order() {
        let reply = r#"Here is the report:
<analysis>
  <subject>Dominion's lawsuit against Fox News</subject>
  <view-points>
    <view-point>
      <point>The parties settled.</point>
      <arguments>
        <argument>Announced by the judge.</argument>
        <argument>Reached before opening statements.</argument>
      </arguments>
    </view-point>
    <view-point>
      <point>Terms are private &amp; may stay so.</point>
      <arguments></arguments>
    </view-point>
  </view-points>
</analysis>"#;

        let analysis = parse_analysis(reply).unwrap();
        assert_eq!(analysis.subject, "Dominion's lawsuit against Fox News");
        assert_eq!(analysis.view_points.len(), 2);
        assert_eq!(
            analysis.view_points[0].arguments,
            vec!["Announced by the judge.", "Reached before opening statements."]
        );
        assert_eq!(analysis.view_points[1].point, "Terms are private & may stay so.");
        assert!(analysis.view_points[1].arguments.is_empty());
    }

    #[test]
    fn analysis_without_subject_is_rejected() {
        let err = parse_analysis("<analysis><view-points></view-points></analysis>").unwrap_err();
        assert!(matches!(err, AppError::Report(_)));
        assert!(parse_analysis("no tags at all").is_err());
    }

    #[test]
    fn parses_rebuttals_and_skips_bad_ids() {
        let reply = r#"<rebuttals>
  <rebuttal>
    <original>Fox defamed Dominion.</original>
    <counter-point>The case was about press freedom.</counter-point>
    <article-id>2</article-id>
    <arguments><argument>Fox said so.</argument></arguments>
  </rebuttal>
  <rebuttal>
    <original>x</original>
    <counter-point>y</counter-point>
    <article-id>abc</article-id>
  </rebuttal>
</rebuttals>"#;

        let counters = parse_counters(reply).unwrap();
        assert_eq!(counters.len(), 1);
        assert_eq!(counters[0].counter_source_item_uuid, 2);
        assert_eq!(counters[0].counter_view_point, "The case was about press freedom.");
        assert_eq!(counters[0].arguments, vec!["Fox said so."]);
    }

    #[test]
    fn fail_token_means_no_counters() {
        assert!(parse_counters(" IGNORE\n").unwrap().is_empty());
    }
}
