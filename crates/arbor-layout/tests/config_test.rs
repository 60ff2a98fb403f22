use arbor_core::ArborConfig;
use arbor_layout::LayoutConfig;
use serde_json::json;

#[test]
fn layout_config_reads_overrides_over_defaults() {
    let cfg = ArborConfig::from_value(json!({
        "layout": { "minHorizontalSpacing": 150, "topMargin": 12.5 }
    }));
    let layout = LayoutConfig::from_config(&cfg).unwrap();
    assert_eq!(layout.min_horizontal_spacing, 150.0);
    assert_eq!(layout.top_margin, 12.5);
    assert_eq!(layout.min_vertical_spacing, 100.0);
    assert_eq!(layout.sibling_separation, 1.2);
}

#[test]
fn layout_config_rejects_non_positive_values() {
    let cfg = ArborConfig::from_value(json!({ "layout": { "nodeWidth": -1 } }));
    let err = LayoutConfig::from_config(&cfg).unwrap_err();
    assert!(err.to_string().contains("layout.nodeWidth"));
}
