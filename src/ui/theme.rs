use egui::{
    style::{Selection, Visuals, WidgetVisuals, Widgets},
    Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle,
};

const PANEL_BG: Color32 = Color32::from_rgb(30, 32, 38);

fn widget(bg_fill: Color32, stroke: Color32, fg: Color32, expansion: f32) -> WidgetVisuals {
    WidgetVisuals {
        bg_fill,
        weak_bg_fill: Color32::from_gray(36),
        bg_stroke: Stroke::new(1.0, stroke),
        fg_stroke: Stroke::new(1.0, fg),
        rounding: Rounding::same(4.0),
        expansion,
    }
}

/// Dark style for the dashboard, so the choropleth colours stand out.
pub fn dashboard_style(ctx: &egui::Context) -> Style {
    let mut style = (*ctx.style()).clone();

    style.text_styles = [
        (TextStyle::Heading, FontId::new(20.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(15.0, FontFamily::Proportional)),
        (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
    ]
    .into();

    style.visuals = Visuals::dark();
    style.visuals.override_text_color = Some(Color32::from_gray(215));
    style.visuals.widgets = Widgets {
        noninteractive: widget(PANEL_BG, Color32::from_gray(60), Color32::from_gray(200), 0.0),
        inactive: widget(Color32::from_gray(44), Color32::from_gray(75), Color32::from_gray(215), 0.0),
        hovered: widget(Color32::from_gray(56), Color32::WHITE, Color32::WHITE, 0.5),
        active: widget(Color32::from_gray(64), Color32::WHITE, Color32::WHITE, 1.0),
        open: widget(Color32::from_gray(40), Color32::WHITE, Color32::WHITE, 0.0),
    };
    style.visuals.selection = Selection {
        bg_fill: Color32::from_rgb(60, 90, 70),
        stroke: Stroke::new(1.0, Color32::WHITE),
    };
    style.visuals.hyperlink_color = Color32::from_rgb(140, 200, 255);

    style.visuals.window_rounding = Rounding::same(6.0);
    style.visuals.window_fill = PANEL_BG;
    style.visuals.window_stroke = Stroke::new(1.0, Color32::from_gray(60));
    style.visuals.panel_fill = PANEL_BG;

    style.spacing.window_margin = egui::Margin::same(8.0);

    style
}
