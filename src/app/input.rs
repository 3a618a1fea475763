//! Translation of winit window events into game loop events

use winit::event::{ElementState, MouseButton, TouchPhase, WindowEvent};

use crate::game::Event;

/// Tracks the pointer and back buffer size needed to translate events
#[derive(Debug, Clone)]
pub struct EventTranslator {
    /// Cursor position in logical units
    cursor: Option<[f32; 2]>,
    scale_factor: f32,
    pixel_size: (u32, u32),
}

impl Default for EventTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTranslator {
    pub fn new() -> Self {
        Self {
            cursor: None,
            scale_factor: 1.0,
            pixel_size: (0, 0),
        }
    }

    /// Update scale factor (DPI scaling)
    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        self.scale_factor = scale_factor;
    }

    pub fn set_pixel_size(&mut self, width: u32, height: u32) {
        self.pixel_size = (width, height);
    }

    /// Returns the game event for `event`, if it maps to one
    pub fn translate(&mut self, event: &WindowEvent) -> Option<Event> {
        match event {
            WindowEvent::CloseRequested => Some(Event::Quit),

            WindowEvent::Resized(size) => {
                self.pixel_size = (size.width, size.height);
                Some(Event::PixelSizeChanged {
                    width: size.width,
                    height: size.height,
                })
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some([
                    position.x as f32 / self.scale_factor,
                    position.y as f32 / self.scale_factor,
                ]);
                None
            }

            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                None
            }

            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => self.cursor.map(|[x, y]| Event::MouseButtonUp { x, y }),

            WindowEvent::Touch(touch) if touch.phase == TouchPhase::Started => {
                let (width, height) = self.pixel_size;
                if width == 0 || height == 0 {
                    return None;
                }
                Some(Event::FingerDown {
                    x: touch.location.x as f32 / width as f32,
                    y: touch.location.y as f32 / height as f32,
                })
            }

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::{PhysicalPosition, PhysicalSize};
    use winit::event::{DeviceId, Touch};

    fn device() -> DeviceId {
        // SAFETY: only used as an opaque identifier in tests
        unsafe { DeviceId::dummy() }
    }

    fn cursor_moved(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: device(),
            position: PhysicalPosition::new(x, y),
        }
    }

    fn left_button(state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: device(),
            state,
            button: MouseButton::Left,
        }
    }

    fn touch(phase: TouchPhase, x: f64, y: f64) -> WindowEvent {
        WindowEvent::Touch(Touch {
            device_id: device(),
            phase,
            location: PhysicalPosition::new(x, y),
            force: None,
            id: 0,
        })
    }

    #[test]
    fn test_close_and_resize() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate(&WindowEvent::CloseRequested),
            Some(Event::Quit)
        );
        assert_eq!(
            translator.translate(&WindowEvent::Resized(PhysicalSize::new(640, 480))),
            Some(Event::PixelSizeChanged {
                width: 640,
                height: 480
            })
        );
    }

    #[test]
    fn test_click_uses_logical_cursor_position() {
        let mut translator = EventTranslator::new();
        translator.set_scale_factor(2.0);

        assert_eq!(translator.translate(&cursor_moved(200.0, 100.0)), None);
        assert_eq!(translator.translate(&left_button(ElementState::Pressed)), None);
        assert_eq!(
            translator.translate(&left_button(ElementState::Released)),
            Some(Event::MouseButtonUp { x: 100.0, y: 50.0 })
        );
    }

    #[test]
    fn test_click_without_cursor_is_dropped() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate(&left_button(ElementState::Released)),
            None
        );
    }

    #[test]
    fn test_touch_is_normalized() {
        let mut translator = EventTranslator::new();
        translator.set_pixel_size(800, 400);

        assert_eq!(
            translator.translate(&touch(TouchPhase::Started, 200.0, 100.0)),
            Some(Event::FingerDown { x: 0.25, y: 0.25 })
        );
        assert_eq!(
            translator.translate(&touch(TouchPhase::Ended, 200.0, 100.0)),
            None
        );
    }
}
