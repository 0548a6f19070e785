//! Parsing of the serialized plot specification embedded in chart payloads.
//!
//! The server answers chart requests with `{"chart": "<json>"}` where the
//! inner string is a full plot document (`data` traces plus `layout`). The
//! client never derives the series itself; it lifts the traces out of the
//! document and hands them to the terminal charting widgets.

use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub name: Option<String>,
    /// Category labels for the x axis (dates, tickers), parallel to `y`.
    pub x: Vec<String>,
    pub y: Vec<f64>,
}

impl Trace {
    /// Index-based points for a line chart; the x labels stay separate.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.y
            .iter()
            .enumerate()
            .map(|(i, &y)| (i as f64, y))
            .collect()
    }

    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        let mut iter = self.y.iter().copied();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some((min, max))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlotSpec {
    pub title: Option<String>,
    pub traces: Vec<Trace>,
}

impl PlotSpec {
    /// Parses the embedded plot document. Unknown trace types and non-numeric
    /// samples are skipped rather than rejected; the document layout is
    /// server-owned and only the parts the terminal can draw are lifted out.
    pub fn parse(raw: &str) -> Result<PlotSpec, serde_json::Error> {
        let doc: Value = serde_json::from_str(raw)?;

        let title = doc
            .pointer("/layout/title/text")
            .or_else(|| doc.pointer("/layout/title"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut traces = Vec::new();
        if let Some(data) = doc.get("data").and_then(Value::as_array) {
            for entry in data {
                let ys = entry.get("y").and_then(Value::as_array);
                let Some(ys) = ys else { continue };
                let xs = entry.get("x").and_then(Value::as_array);

                let mut trace = Trace {
                    name: entry.get("name").and_then(Value::as_str).map(str::to_string),
                    ..Trace::default()
                };
                for (i, y) in ys.iter().enumerate() {
                    let Some(y) = y.as_f64() else { continue };
                    let label = xs
                        .and_then(|xs| xs.get(i))
                        .map(label_of)
                        .unwrap_or_else(|| i.to_string());
                    trace.x.push(label);
                    trace.y.push(y);
                }
                if !trace.y.is_empty() {
                    traces.push(trace);
                }
            }
        }

        Ok(PlotSpec { title, traces })
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Overall y bounds across all traces, padded so flat series still get a
    /// visible band to draw in.
    pub fn y_bounds(&self) -> (f64, f64) {
        let mut bounds: Option<(f64, f64)> = None;
        for trace in &self.traces {
            if let Some((lo, hi)) = trace.y_bounds() {
                bounds = Some(match bounds {
                    Some((a, b)) => (a.min(lo), b.max(hi)),
                    None => (lo, hi),
                });
            }
        }
        let (lo, hi) = bounds.unwrap_or((0.0, 1.0));
        if (hi - lo).abs() < f64::EPSILON {
            (lo - 1.0, hi + 1.0)
        } else {
            (lo, hi)
        }
    }
}

fn label_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE_CHART: &str = r#"{
        "data": [{
            "type": "scatter",
            "name": "Close",
            "x": ["2024-01-02", "2024-01-03", "2024-01-04"],
            "y": [471.1, 468.8, 467.3]
        }],
        "layout": {"title": {"text": "SPY Price (1y)"}}
    }"#;

    #[test]
    fn parses_traces_and_nested_title() {
        let spec = PlotSpec::parse(PRICE_CHART).unwrap();
        assert_eq!(spec.title.as_deref(), Some("SPY Price (1y)"));
        assert_eq!(spec.traces.len(), 1);
        assert_eq!(spec.traces[0].y, vec![471.1, 468.8, 467.3]);
        assert_eq!(spec.traces[0].x[0], "2024-01-02");
    }

    #[test]
    fn parses_plain_string_title() {
        let spec =
            PlotSpec::parse(r#"{"data":[],"layout":{"title":"Dividends"}}"#).unwrap();
        assert_eq!(spec.title.as_deref(), Some("Dividends"));
        assert!(spec.is_empty());
    }

    #[test]
    fn skips_null_samples() {
        let spec = PlotSpec::parse(
            r#"{"data":[{"x":["a","b","c"],"y":[1.0,null,3.0]}],"layout":{}}"#,
        )
        .unwrap();
        assert_eq!(spec.traces[0].y, vec![1.0, 3.0]);
        assert_eq!(spec.traces[0].x, vec!["a", "c"]);
    }

    #[test]
    fn flat_series_gets_padded_bounds() {
        let spec =
            PlotSpec::parse(r#"{"data":[{"y":[2.0,2.0]}],"layout":{}}"#).unwrap();
        let (lo, hi) = spec.y_bounds();
        assert!(lo < 2.0 && hi > 2.0);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(PlotSpec::parse("not json").is_err());
    }
}
