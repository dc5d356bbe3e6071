pub mod common;

use embassy_futures::select::select;
use embassy_futures::yield_now;
use mouse_layer::channel::{FLASH_CHANNEL, KEY_FORWARD_CHANNEL, MOUSE_REPORT_CHANNEL};
use mouse_layer::config::{PointerSettings, StorageConfig};
use mouse_layer::event::{Event, KeyEvent, MotionEvent};
use mouse_layer::keycode::KeyCode;
use mouse_layer::processor::{InputProcessor, MouseLayerProcessor};
use mouse_layer::state::MouseLayerState;
use mouse_layer::storage::{FlashOperationMessage, Storage};
use rusty_fork::rusty_fork_test;

use crate::common::{MemFlash, advance_ms, motion_tick, new_controller, test_block_on};

fn key(key: KeyCode, pressed: bool) -> Event {
    Event::Key(KeyEvent { key, pressed })
}

fn motion(dx: i16, dy: i16) -> Event {
    Event::Motion(MotionEvent { dx, dy })
}

rusty_fork_test! {
    #[test]
    fn test_layer_times_out_after_inactivity() {
        let mut ctrl = new_controller();

        motion_tick(&mut ctrl, 30, 0);
        motion_tick(&mut ctrl, 30, 0);
        motion_tick(&mut ctrl, 20, 0);
        assert_eq!(ctrl.state(), MouseLayerState::LayerActive);
        assert!(ctrl.layer_switch().active[8]);

        // Exactly at the timeout the layer must still be up.
        advance_ms(1000);
        motion_tick(&mut ctrl, 0, 0);
        assert_eq!(ctrl.state(), MouseLayerState::LayerActive);

        advance_ms(1);
        motion_tick(&mut ctrl, 0, 0);
        assert_eq!(ctrl.state(), MouseLayerState::Idle);
        assert!(!ctrl.layer_switch().active[8]);
    }

    #[test]
    fn test_free_movement_keeps_layer_alive() {
        let mut ctrl = new_controller();
        motion_tick(&mut ctrl, 30, 0);
        motion_tick(&mut ctrl, 30, 30);
        assert_eq!(ctrl.state(), MouseLayerState::LayerActive);

        for _ in 0..5 {
            advance_ms(900);
            motion_tick(&mut ctrl, 1, 0);
        }
        // 4.5s of wall time, but no 1s gap without motion.
        motion_tick(&mut ctrl, 0, 0);
        assert_eq!(ctrl.state(), MouseLayerState::LayerActive);
    }

    #[test]
    fn test_partial_motion_settles_back_to_idle() {
        let mut ctrl = new_controller();

        motion_tick(&mut ctrl, 10, 0);
        motion_tick(&mut ctrl, 10, 0);
        assert_eq!(ctrl.state(), MouseLayerState::Accumulating);

        advance_ms(50);
        motion_tick(&mut ctrl, 0, 0);
        assert_eq!(ctrl.state(), MouseLayerState::Accumulating);

        advance_ms(1);
        motion_tick(&mut ctrl, 0, 0);
        assert_eq!(ctrl.state(), MouseLayerState::Idle);
        assert!(!ctrl.layer_switch().active[8]);

        // The discarded partial motion must not count after settling.
        motion_tick(&mut ctrl, 10, 0);
        motion_tick(&mut ctrl, 45, 0);
        assert_eq!(ctrl.state(), MouseLayerState::Accumulating);
        motion_tick(&mut ctrl, 5, 0);
        assert_eq!(ctrl.state(), MouseLayerState::LayerActive);
    }

    #[test]
    fn test_settle_timer_refreshes_on_motion() {
        let mut ctrl = new_controller();

        motion_tick(&mut ctrl, 10, 0);
        for _ in 0..4 {
            advance_ms(40);
            motion_tick(&mut ctrl, 1, 0);
        }
        // 160ms since the first motion, but never a 50ms silent gap.
        advance_ms(40);
        motion_tick(&mut ctrl, 0, 0);
        assert_eq!(ctrl.state(), MouseLayerState::Accumulating);

        advance_ms(11);
        motion_tick(&mut ctrl, 0, 0);
        assert_eq!(ctrl.state(), MouseLayerState::Idle);
    }

    #[test]
    fn test_button_press_locks_motion_briefly() {
        let mut ctrl = new_controller();

        test_block_on(ctrl.process_key(KeyCode::MouseBtn1, true));
        assert_eq!(ctrl.state(), MouseLayerState::ButtonHeld);
        assert!(ctrl.layer_switch().active[8]);

        // The button report goes out immediately, without waiting for motion.
        let report = MOUSE_REPORT_CHANNEL.try_receive().unwrap();
        assert_eq!(report.buttons, 1);
        assert_eq!((report.x, report.y), (0, 0));

        // 29 units into the 30-unit lock: still suppressed.
        let report = motion_tick(&mut ctrl, 15, 10);
        assert_eq!((report.x, report.y), (0, 0));
        let report = motion_tick(&mut ctrl, 2, 2);
        assert_eq!((report.x, report.y), (0, 0));
        // 31 units: the lock is spent, motion passes again.
        let report = motion_tick(&mut ctrl, 1, 1);
        assert_eq!((report.x, report.y), (1, 1));
        assert_eq!(ctrl.state(), MouseLayerState::ButtonHeld);

        // No timeout while the button is down.
        advance_ms(5000);
        motion_tick(&mut ctrl, 0, 0);
        assert_eq!(ctrl.state(), MouseLayerState::ButtonHeld);

        test_block_on(ctrl.process_key(KeyCode::MouseBtn1, false));
        assert_eq!(ctrl.state(), MouseLayerState::LayerActive);
        let report = MOUSE_REPORT_CHANNEL.try_receive().unwrap();
        assert_eq!(report.buttons, 0);
    }

    #[test]
    fn test_keys_absorbed_while_clicking_forwarded_while_idle() {
        let mut processor = MouseLayerProcessor::new(new_controller());

        // Idle typing passes through untouched.
        test_block_on(processor.process(key(KeyCode::A, true)));
        assert_eq!(
            KEY_FORWARD_CHANNEL.try_receive().unwrap(),
            KeyEvent { key: KeyCode::A, pressed: true }
        );

        test_block_on(processor.process(key(KeyCode::MouseBtn1, true)));
        assert!(MOUSE_REPORT_CHANNEL.try_receive().is_ok());
        assert!(KEY_FORWARD_CHANNEL.try_receive().is_err());

        // While the button is held, other presses are swallowed and only
        // dismiss back to the plain click layer.
        test_block_on(processor.process(key(KeyCode::B, true)));
        assert!(KEY_FORWARD_CHANNEL.try_receive().is_err());
        assert_eq!(processor.controller().state(), MouseLayerState::LayerActive);

        // Releases still pass through.
        test_block_on(processor.process(key(KeyCode::B, false)));
        assert_eq!(
            KEY_FORWARD_CHANNEL.try_receive().unwrap(),
            KeyEvent { key: KeyCode::B, pressed: false }
        );

        // Modifiers keep the layer up and pass through for chording.
        test_block_on(processor.process(key(KeyCode::LGui, true)));
        assert_eq!(
            KEY_FORWARD_CHANNEL.try_receive().unwrap(),
            KeyEvent { key: KeyCode::LGui, pressed: true }
        );
        assert_eq!(processor.controller().state(), MouseLayerState::LayerActive);
    }

    #[test]
    fn test_motion_reports_through_processor() {
        let mut processor = MouseLayerProcessor::new(new_controller());

        test_block_on(processor.process(motion(30, 30)));
        let report = MOUSE_REPORT_CHANNEL.try_receive().unwrap();
        assert_eq!((report.x, report.y), (30, 30));
        assert_eq!(processor.controller().state(), MouseLayerState::Accumulating);

        test_block_on(processor.process(motion(20, 5)));
        let report = MOUSE_REPORT_CHANNEL.try_receive().unwrap();
        assert_eq!((report.x, report.y), (20, 5));

        test_block_on(processor.process(motion(30, 0)));
        let report = MOUSE_REPORT_CHANNEL.try_receive().unwrap();
        assert_eq!((report.x, report.y), (30, 0));
        assert_eq!(processor.controller().state(), MouseLayerState::LayerActive);
        assert!(processor.controller().layer_switch().active[8]);
    }

    #[test]
    fn test_scroll_steps_through_processor() {
        let mut processor = MouseLayerProcessor::new(new_controller());

        test_block_on(processor.process(key(KeyCode::ScrollMode, true)));
        assert_eq!(processor.controller().state(), MouseLayerState::Scrolling);

        // The drain is strict, so the first 50-unit tick only seeds the
        // accumulator; each of the next three crosses the threshold.
        for _ in 0..4 {
            test_block_on(processor.process(motion(0, 50)));
        }
        for _ in 0..3 {
            let report = MOUSE_REPORT_CHANNEL.try_receive().unwrap();
            assert_eq!((report.x, report.y), (0, 0));
            assert_eq!(report.wheel, 1);
        }
        // The seeding tick produced no report at all.
        assert!(MOUSE_REPORT_CHANNEL.try_receive().is_err());

        // Leaving scroll mode clears the partial accumulators.
        test_block_on(processor.process(key(KeyCode::ScrollMode, false)));
        assert_eq!(processor.controller().state(), MouseLayerState::LayerActive);
    }

    #[test]
    fn test_drag_scroll_through_processor() {
        let mut processor = MouseLayerProcessor::new(new_controller());

        test_block_on(processor.process(key(KeyCode::DragScroll, true)));
        test_block_on(processor.process(motion(7, -3)));
        let report = MOUSE_REPORT_CHANNEL.try_receive().unwrap();
        assert_eq!((report.x, report.y), (0, 0));
        assert_eq!((report.pan, report.wheel), (7, 3));

        test_block_on(processor.process(key(KeyCode::DragScroll, false)));
        test_block_on(processor.process(motion(7, -3)));
        let report = MOUSE_REPORT_CHANNEL.try_receive().unwrap();
        assert_eq!((report.x, report.y), (7, -3));
        assert_eq!((report.pan, report.wheel), (0, 0));
    }

    #[test]
    fn test_settings_keys_write_through() {
        let mut ctrl = new_controller();

        test_block_on(ctrl.process_key(KeyCode::ActivationDistanceInc, true));
        match FLASH_CHANNEL.try_receive().unwrap() {
            FlashOperationMessage::PointerSettings(settings) => {
                assert_eq!(settings.activation_distance, 55);
            }
            other => panic!("unexpected flash message: {:?}", other),
        }
        test_block_on(ctrl.process_key(KeyCode::ActivationDistanceInc, false));
        // Releases do not save again.
        assert!(FLASH_CHANNEL.try_receive().is_err());

        // Repeated decrease clamps at the floor instead of going below.
        let mut last = 0;
        for _ in 0..12 {
            test_block_on(ctrl.process_key(KeyCode::ActivationDistanceDec, true));
            match FLASH_CHANNEL.try_receive().unwrap() {
                FlashOperationMessage::PointerSettings(settings) => last = settings.activation_distance,
                other => panic!("unexpected flash message: {:?}", other),
            }
        }
        assert_eq!(last, 5);
        assert_eq!(ctrl.settings().activation_distance, 5);

        test_block_on(ctrl.process_key(KeyCode::ScrollReverseV, true));
        match FLASH_CHANNEL.try_receive().unwrap() {
            FlashOperationMessage::PointerSettings(settings) => {
                assert!(settings.reverse_vertical_scroll);
                assert!(!settings.reverse_horizontal_scroll);
            }
            other => panic!("unexpected flash message: {:?}", other),
        }
    }

    #[test]
    fn test_larger_activation_distance_takes_effect() {
        let mut ctrl = new_controller();
        test_block_on(ctrl.process_key(KeyCode::ActivationDistanceInc, true));
        let _ = FLASH_CHANNEL.try_receive();
        assert_eq!(ctrl.settings().activation_distance, 55);

        motion_tick(&mut ctrl, 30, 0);
        motion_tick(&mut ctrl, 50, 0);
        assert_eq!(ctrl.state(), MouseLayerState::Accumulating);
        motion_tick(&mut ctrl, 5, 0);
        assert_eq!(ctrl.state(), MouseLayerState::LayerActive);
    }

    #[test]
    fn test_storage_first_boot_and_reboot_persistence() {
        let flash = MemFlash::new();

        let mut storage = test_block_on(Storage::new(
            flash.clone(),
            &PointerSettings::default(),
            &StorageConfig::default(),
        ));
        assert_eq!(
            test_block_on(storage.read_settings()),
            Some(PointerSettings::default())
        );

        let custom = PointerSettings {
            activation_distance: 75,
            reverse_vertical_scroll: true,
            reverse_horizontal_scroll: false,
        };
        test_block_on(async {
            FLASH_CHANNEL.send(FlashOperationMessage::PointerSettings(custom)).await;
            // Give the storage task enough polls to apply the save.
            select(storage.run(), async {
                for _ in 0..256 {
                    yield_now().await;
                }
            })
            .await;
        });
        assert_eq!(test_block_on(storage.read_settings()), Some(custom));

        // Reboot on top of the same flash contents: saved settings win over
        // the defaults.
        let mut rebooted = test_block_on(Storage::new(
            flash.clone(),
            &PointerSettings::default(),
            &StorageConfig::default(),
        ));
        assert_eq!(test_block_on(rebooted.read_settings()), Some(custom));
    }

    #[test]
    fn test_storage_reset_clears_settings() {
        let flash = MemFlash::new();
        let custom = PointerSettings {
            activation_distance: 20,
            reverse_vertical_scroll: false,
            reverse_horizontal_scroll: true,
        };

        let mut storage = test_block_on(Storage::new(flash.clone(), &custom, &StorageConfig::default()));
        assert_eq!(test_block_on(storage.read_settings()), Some(custom));

        test_block_on(async {
            FLASH_CHANNEL.send(FlashOperationMessage::Reset).await;
            select(storage.run(), async {
                for _ in 0..256 {
                    yield_now().await;
                }
            })
            .await;
        });
        assert_eq!(test_block_on(storage.read_settings()), None);

        // The next boot reinitializes from the defaults.
        let mut rebooted = test_block_on(Storage::new(
            flash.clone(),
            &PointerSettings::default(),
            &StorageConfig::default(),
        ));
        assert_eq!(
            test_block_on(rebooted.read_settings()),
            Some(PointerSettings::default())
        );
    }
}
