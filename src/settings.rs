// ============================================================================
// TRANSFORM SETTINGS — tunables persisted as a key=value .cfg file
// ============================================================================

use std::path::PathBuf;

use egui::Color32;

use crate::ops::resample::{RotationFilter, ScaleFilter};
use crate::selection::MIN_SCALE;

/// Every constant the selection tool, hit tester and renderer share.
/// Pixel values are view-space (screen) pixels unless noted.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformSettings {
    /// Side of a square scale handle.
    pub handle_size: f32,
    /// Extra grab margin around scale handles, independent of zoom.
    pub handle_hit_padding: f32,
    /// Distance of rotation handles outward from the scale handles.
    pub rotate_handle_offset: f32,
    pub rotate_handle_radius: f32,
    pub pivot_radius: f32,
    /// Snap distance for the pivot, in document pixels.
    pub pivot_snap_radius: f32,
    pub dash_on: f32,
    pub dash_off: f32,
    /// Marching-ants phase advance per frame.
    pub ants_speed: f32,
    pub min_scale: f32,
    /// Constrained rotation step, degrees.
    pub rotation_snap_deg: f32,
    pub scale_filter: ScaleFilter,
    pub rotation_filter: RotationFilter,
    pub link_scale: bool,
    pub handle_fill: Color32,
    pub handle_stroke: Color32,
    pub accent: Color32,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            handle_size: 8.0,
            handle_hit_padding: 4.0,
            rotate_handle_offset: 18.0,
            rotate_handle_radius: 7.0,
            pivot_radius: 6.0,
            pivot_snap_radius: 8.0,
            dash_on: 4.0,
            dash_off: 4.0,
            ants_speed: 0.5,
            min_scale: MIN_SCALE,
            rotation_snap_deg: 15.0,
            scale_filter: ScaleFilter::Nearest,
            rotation_filter: RotationFilter::Nearest,
            link_scale: true,
            handle_fill: Color32::WHITE,
            handle_stroke: Color32::from_rgb(30, 30, 30),
            accent: Color32::from_rgb(66, 133, 244),
        }
    }
}

impl TransformSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixlift/pixlift_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\pixlift\pixlift_settings.cfg
    /// On macOS:   ~/Library/Application Support/pixlift/pixlift_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("pixlift");
            Some(config_dir.join("pixlift_settings.cfg"))
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            Some(PathBuf::from(appdata).join("pixlift").join("pixlift_settings.cfg"))
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("pixlift")
                    .join("pixlift_settings.cfg"),
            )
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join("pixlift_settings.cfg")))
        }
    }

    fn color_to_str(c: Color32) -> String {
        format!("{},{},{},{}", c.r(), c.g(), c.b(), c.a())
    }

    fn str_to_color(s: &str) -> Option<Color32> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return None;
        }
        let r = parts[0].trim().parse::<u8>().ok()?;
        let g = parts[1].trim().parse::<u8>().ok()?;
        let b = parts[2].trim().parse::<u8>().ok()?;
        let a = parts[3].trim().parse::<u8>().ok()?;
        Some(Color32::from_rgba_unmultiplied(r, g, b, a))
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "handle_size={}\n\
             handle_hit_padding={}\n\
             rotate_handle_offset={}\n\
             rotate_handle_radius={}\n\
             pivot_radius={}\n\
             pivot_snap_radius={}\n\
             dash_on={}\n\
             dash_off={}\n\
             ants_speed={}\n\
             min_scale={}\n\
             rotation_snap_deg={}\n\
             scale_filter={}\n\
             rotation_filter={}\n\
             link_scale={}\n\
             handle_fill={}\n\
             handle_stroke={}\n\
             accent={}\n",
            self.handle_size,
            self.handle_hit_padding,
            self.rotate_handle_offset,
            self.rotate_handle_radius,
            self.pivot_radius,
            self.pivot_snap_radius,
            self.dash_on,
            self.dash_off,
            self.ants_speed,
            self.min_scale,
            self.rotation_snap_deg,
            self.scale_filter.key(),
            self.rotation_filter.key(),
            self.link_scale,
            Self::color_to_str(self.handle_fill),
            Self::color_to_str(self.handle_stroke),
            Self::color_to_str(self.accent),
        )
    }

    /// Parse config text.  Unknown keys are skipped; bad values keep defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "handle_size" => set_positive(&mut s.handle_size, key, val),
                "handle_hit_padding" => set_non_negative(&mut s.handle_hit_padding, key, val),
                "rotate_handle_offset" => set_non_negative(&mut s.rotate_handle_offset, key, val),
                "rotate_handle_radius" => set_positive(&mut s.rotate_handle_radius, key, val),
                "pivot_radius" => set_positive(&mut s.pivot_radius, key, val),
                "pivot_snap_radius" => set_non_negative(&mut s.pivot_snap_radius, key, val),
                "dash_on" => set_positive(&mut s.dash_on, key, val),
                "dash_off" => set_non_negative(&mut s.dash_off, key, val),
                "ants_speed" => set_non_negative(&mut s.ants_speed, key, val),
                "min_scale" => set_positive(&mut s.min_scale, key, val),
                "rotation_snap_deg" => set_positive(&mut s.rotation_snap_deg, key, val),
                "scale_filter" => match ScaleFilter::from_key(val) {
                    Some(f) => s.scale_filter = f,
                    None => crate::log_warn!("settings: unknown scale filter {:?}", val),
                },
                "rotation_filter" => match RotationFilter::from_key(val) {
                    Some(f) => s.rotation_filter = f,
                    None => crate::log_warn!("settings: unknown rotation filter {:?}", val),
                },
                "link_scale" => s.link_scale = val == "true",
                "handle_fill" => {
                    if let Some(c) = Self::str_to_color(val) { s.handle_fill = c; }
                }
                "handle_stroke" => {
                    if let Some(c) = Self::str_to_color(val) { s.handle_stroke = c; }
                }
                "accent" => {
                    if let Some(c) = Self::str_to_color(val) { s.accent = c; }
                }
                _ => {}
            }
        }
        s
    }

    /// Load settings from disk (defaults if the file is missing).
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::parse(&content)
    }

    /// Save settings to disk.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = std::fs::write(&path, self.to_config_string()) {
            crate::log_warn!("settings: failed to write {}: {}", path.display(), e);
        }
    }

    /// Dash pattern period.
    pub fn dash_period(&self) -> f32 {
        (self.dash_on + self.dash_off).max(1.0)
    }
}

fn set_positive(slot: &mut f32, key: &str, val: &str) {
    match val.parse::<f32>() {
        Ok(v) if v.is_finite() && v > 0.0 => *slot = v,
        _ => crate::log_warn!("settings: bad value for {}: {:?}", key, val),
    }
}

fn set_non_negative(slot: &mut f32, key: &str, val: &str) {
    match val.parse::<f32>() {
        Ok(v) if v.is_finite() && v >= 0.0 => *slot = v,
        _ => crate::log_warn!("settings: bad value for {}: {:?}", key, val),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_string_round_trips() {
        let mut s = TransformSettings::default();
        s.handle_size = 10.0;
        s.scale_filter = ScaleFilter::Epx;
        s.rotation_filter = RotationFilter::RotSprite;
        s.link_scale = false;
        s.accent = Color32::from_rgb(1, 2, 3);
        assert_eq!(TransformSettings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn unknown_keys_and_bad_values_keep_defaults() {
        let s = TransformSettings::parse(
            "# comment\nfoo=bar\nhandle_size=-3\ndash_on=abc\nscale_filter=lanczos\nno equals sign\nants_speed = 2\n",
        );
        let mut expected = TransformSettings::default();
        expected.ants_speed = 2.0;
        assert_eq!(s, expected);
    }

    #[test]
    fn dash_period_never_zero() {
        let mut s = TransformSettings::default();
        s.dash_on = 0.1;
        s.dash_off = 0.0;
        assert_eq!(s.dash_period(), 1.0);
    }
}
