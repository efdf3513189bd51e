use egui::Context;

use crate::controller::FrameLoopContext;

/// Build the complete UI for this frame and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, ctx: &mut FrameLoopContext) -> egui::FullOutput {
    let viewport_width = ctx.viewport.0 as f32 / egui_ctx.pixels_per_point();
    egui_ctx.run(raw_input, |ui_ctx| {
        draw_stats_window(ui_ctx, ctx);
        draw_controls_window(ui_ctx, ctx, viewport_width);
    })
}

fn draw_stats_window(ctx: &Context, frame: &FrameLoopContext) {
    let stats = &frame.stats;
    egui::Window::new("Stats")
        .default_pos([8.0, 8.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {:.0}", stats.fps)).small());
            ui.label(egui::RichText::new(format!("Frame: {:.1} ms", stats.frame_ms)).small());
            ui.label(egui::RichText::new(format!("Bodies: {}", frame.world.len())).small());
            ui.label(egui::RichText::new(format!("Steps: {}", stats.steps)).small());
            ui.label(
                egui::RichText::new(format!(
                    "Gravity: {:.1} {:.1} {:.1}",
                    stats.gravity.x, stats.gravity.y, stats.gravity.z
                ))
                .small(),
            );
            ui.label(
                egui::RichText::new(format!(
                    "Contact: {} ({})",
                    if stats.contact { "yes" } else { "no" },
                    frame.driver.policy_name()
                ))
                .small(),
            );
            ui.separator();
            ui.label(egui::RichText::new("WASD - Move character").small());
            ui.label(egui::RichText::new("Left Shift - Run").small());
            ui.label(egui::RichText::new("Drag - Orbit, Wheel - Zoom").small());
        });
}

fn draw_controls_window(ctx: &Context, frame: &mut FrameLoopContext, viewport_width: f32) {
    egui::Window::new("Controls")
        .default_pos([viewport_width - 240.0, 8.0])
        .default_width(230.0)
        .show(ctx, |ui| {
            let clips = frame.config.assets.clips.clone();
            let mut choice = frame.selected_clip.clone();
            egui::ComboBox::from_label("Asset")
                .selected_text(choice.as_str())
                .show_ui(ui, |ui| {
                    for clip in &clips {
                        ui.selectable_value(&mut choice, clip.clone(), clip.as_str());
                    }
                });
            if choice != frame.selected_clip {
                frame.select_clip(&choice);
            }
            if frame.character.is_loading() {
                ui.label(egui::RichText::new("Loading...").small().italics());
            }

            let Some(character) = frame.character.active_mut() else {
                return;
            };
            if !character.has_morphs() {
                return;
            }
            ui.collapsing("Morphs", |ui| {
                for (set, weights) in character.model.morph_sets.iter().zip(character.morph_weights.iter_mut()) {
                    ui.label(egui::RichText::new(set.name.as_str()).small());
                    for (name, weight) in set.target_names.iter().zip(weights.iter_mut()) {
                        ui.add(egui::Slider::new(weight, 0.0..=1.0).step_by(0.01).text(name.as_str()));
                    }
                }
            });
        });
}
