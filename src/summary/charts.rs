//! The pie chart of expenses by category shown on the stats page.
//!
//! The chart is built as an ECharts configuration and initialised by a small
//! script added to the page head.

use charming::{
    Chart,
    component::{Legend, Title},
    element::{JsFunction, Tooltip, Trigger},
    series::Pie,
};
use maud::{Markup, PreEscaped, html};
use rust_decimal::prelude::ToPrimitive;

use crate::{html::HeadElement, summary::aggregation::CategoryTotal};

/// The HTML element ID of the expense chart.
pub(super) const EXPENSE_CHART_ID: &str = "expense-chart";

/// The URL of the ECharts library.
pub(super) const ECHARTS_SCRIPT_URL: &str =
    "https://cdn.jsdelivr.net/npm/echarts@5.5.1/dist/echarts.min.js";

/// A chart with its HTML container ID and ECharts configuration.
pub(super) struct StatsChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// The container the chart is drawn into.
pub(super) fn chart_view(chart: &StatsChart) -> Markup {
    html!(
        div id=(chart.id) class="chart" {}
    )
}

/// Generates the JavaScript that initialises `chart` once the page has loaded.
pub(super) fn chart_script(chart: &StatsChart) -> HeadElement {
    let script = format!(
        r#"document.addEventListener('DOMContentLoaded', function() {{
            const chartDom = document.getElementById("{}");
            if (!chartDom) {{
                return;
            }}
            const chart = echarts.init(chartDom);
            chart.setOption({});

            window.addEventListener('resize', chart.resize);
        }});"#,
        chart.id, chart.options
    );

    HeadElement::ScriptSource(PreEscaped(script))
}

/// A pie chart of the expense totals by category.
pub(super) fn expense_pie_chart(expenses: &[CategoryTotal], subtitle: &str) -> Chart {
    let data: Vec<(f64, String)> = expenses
        .iter()
        .map(|total| {
            (
                total.total.to_f64().unwrap_or_default(),
                total.category.clone(),
            )
        })
        .collect();

    Chart::new()
        .title(
            Title::new()
                .text("Expenses by category")
                .subtext(subtitle)
                .left("center"),
        )
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom("0"))
        .series(
            Pie::new()
                .name("Expenses")
                .radius(vec!["35%", "65%"])
                .data(data),
        )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "return (number) ? Number(number).toFixed(2) : \"-\";",
    )
}
