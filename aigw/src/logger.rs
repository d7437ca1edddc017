use config::Settings;
use logforth::{
    append::Stdout,
    layout::{JsonLayout, TextLayout},
};

use crate::args::LogStyle;

pub(super) fn init(settings: &Settings, style: LogStyle) {
    logforth::builder()
        .dispatch(|d| {
            let d = d.filter(settings.log_level.level_filter());

            match style {
                LogStyle::Color => d.append(Stdout::default().with_layout(TextLayout::default())),
                LogStyle::Text => d.append(Stdout::default().with_layout(TextLayout::default().no_color())),
                LogStyle::Json => d.append(Stdout::default().with_layout(JsonLayout::default())),
            }
        })
        .apply();
}
