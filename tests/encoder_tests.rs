use pcf8574_dispatch::{Dispatcher, EncoderPins, ExpanderError, MockBus, PortExpander, RotaryEncoder};

const ADDR: u8 = 0x38;
const PINS: EncoderPins = EncoderPins {
    a: 0,
    b: 1,
    button: 2,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn encoder() -> (MockBus, RotaryEncoder<MockBus>) {
    init_logger();
    let bus = MockBus::new().with_chip(ADDR);
    let expander = PortExpander::new(bus.clone(), ADDR).unwrap();
    let encoder = RotaryEncoder::new(expander, PINS).unwrap();
    (bus, encoder)
}

fn step(bus: &MockBus, encoder: &mut RotaryEncoder<MockBus>, pin: u8, high: bool) {
    bus.set_pin(ADDR, pin, high);
    encoder.handle_irq().unwrap();
}

#[test]
fn init_releases_quadrature_lines_and_seeds_sample() {
    init_logger();
    let bus = MockBus::new().with_chip(ADDR);
    let mut expander = PortExpander::new(bus.clone(), ADDR).unwrap();
    expander.write(0xF0).unwrap();
    expander.read().unwrap();

    let encoder = RotaryEncoder::new(expander, PINS).unwrap();
    assert_eq!(bus.writes(ADDR).last(), Some(&0xF3));
    assert_eq!(encoder.last_sample(), 0xF3);
    assert_eq!(encoder.expander().last_value(), 0xF3);
    assert_eq!(encoder.counter(), 0);
    assert!(!encoder.button_held());
    assert!(!encoder.click_pending());
}

#[test]
fn button_held_during_init_stays_latched_low() {
    init_logger();
    let bus = MockBus::new().with_chip(ADDR);
    bus.set_pin(ADDR, PINS.button, false);
    let expander = PortExpander::new(bus.clone(), ADDR).unwrap();

    let encoder = RotaryEncoder::new(expander, PINS).unwrap();
    assert_eq!(bus.latch(ADDR), Some(0xFB));

    bus.set_pin(ADDR, PINS.button, true);
    assert_eq!(bus.port(ADDR), Some(0xFB));

    let mut expander = encoder.into_inner();
    expander.write(0xFF).unwrap();
    assert_eq!(bus.port(ADDR), Some(0xFF));
}

#[test]
fn rejects_bad_pin_maps() {
    init_logger();
    let bus = MockBus::new().with_chip(ADDR);

    let expander = PortExpander::new(bus.clone(), ADDR).unwrap();
    let out_of_range = EncoderPins { a: 8, ..PINS };
    assert!(matches!(
        RotaryEncoder::new(expander, out_of_range),
        Err(ExpanderError::InvalidParameter(_))
    ));

    let expander = PortExpander::new(bus, ADDR).unwrap();
    let shared = EncoderPins { a: 3, b: 3, button: 4 };
    assert!(matches!(
        RotaryEncoder::new(expander, shared),
        Err(ExpanderError::InvalidParameter(_))
    ));
}

#[test]
fn falling_a_counts_by_level_of_b() {
    let (bus, mut encoder) = encoder();

    step(&bus, &mut encoder, PINS.a, false);
    assert_eq!(encoder.counter(), 1);

    step(&bus, &mut encoder, PINS.a, true);
    step(&bus, &mut encoder, PINS.b, false);
    assert_eq!(encoder.counter(), 1);

    step(&bus, &mut encoder, PINS.a, false);
    assert_eq!(encoder.counter(), 0);
}

#[test]
fn full_detents_accumulate_in_both_directions() {
    let (bus, mut encoder) = encoder();

    // B falls first: counts down.
    for _ in 0..3 {
        step(&bus, &mut encoder, PINS.b, false);
        step(&bus, &mut encoder, PINS.a, false);
        step(&bus, &mut encoder, PINS.b, true);
        step(&bus, &mut encoder, PINS.a, true);
    }
    assert_eq!(encoder.counter(), -3);

    // A falls first: counts up.
    for _ in 0..5 {
        step(&bus, &mut encoder, PINS.a, false);
        step(&bus, &mut encoder, PINS.b, false);
        step(&bus, &mut encoder, PINS.a, true);
        step(&bus, &mut encoder, PINS.b, true);
    }
    assert_eq!(encoder.counter(), 2);
}

#[test]
fn counter_wraps_at_the_limits() {
    let (bus, mut encoder) = encoder();
    encoder.set_counter(i32::MAX);
    step(&bus, &mut encoder, PINS.a, false);
    assert_eq!(encoder.counter(), i32::MIN);
}

#[test]
fn press_marks_click_and_release_starts_hold() {
    let (bus, mut encoder) = encoder();

    step(&bus, &mut encoder, PINS.button, false);
    assert!(encoder.click_pending());
    assert!(!encoder.button_held());

    step(&bus, &mut encoder, PINS.button, true);
    assert!(!encoder.click_pending());
    assert!(encoder.button_held());
    assert_eq!(encoder.held_ticks(), 0);

    for _ in 0..10 {
        encoder.tick();
    }
    assert_eq!(encoder.held_ticks(), 10);

    step(&bus, &mut encoder, PINS.button, false);
    step(&bus, &mut encoder, PINS.button, true);
    assert_eq!(encoder.held_ticks(), 0);
}

#[test]
fn ticks_do_nothing_until_button_held() {
    let (bus, mut encoder) = encoder();
    for _ in 0..4 {
        encoder.tick();
    }
    assert_eq!(encoder.held_ticks(), 0);

    step(&bus, &mut encoder, PINS.button, false);
    encoder.tick();
    assert_eq!(encoder.held_ticks(), 0);
}

#[test]
fn take_click_consumes_the_pending_click() {
    let (bus, mut encoder) = encoder();
    step(&bus, &mut encoder, PINS.button, false);

    assert!(encoder.take_click());
    assert!(!encoder.take_click());
    assert!(!encoder.click_pending());
}

#[test]
fn dispatcher_routes_interrupts_and_ticks_to_encoders() {
    let (bus, encoder) = encoder();
    let mut dispatcher = Dispatcher::new();
    let plain = dispatcher.register(PortExpander::new(bus.clone(), ADDR).unwrap());
    let id = dispatcher.register_encoder(encoder);

    bus.set_pin(ADDR, PINS.a, false);
    dispatcher.ext_irq_handle();
    assert_eq!(dispatcher.encoder(id).map(RotaryEncoder::counter), Some(1));

    bus.set_pin(ADDR, PINS.button, false);
    dispatcher.ext_irq_handle();
    bus.set_pin(ADDR, PINS.button, true);
    dispatcher.ext_irq_handle();
    for _ in 0..10 {
        dispatcher.ms_tick();
    }

    let encoder = dispatcher.encoder(id).unwrap();
    assert!(encoder.button_held());
    assert_eq!(encoder.held_ticks(), 10);
    assert!(dispatcher.encoder(plain).is_none());
}

#[test]
fn spare_pins_of_a_registered_encoder_stay_writable() {
    let (bus, encoder) = encoder();
    let mut dispatcher = Dispatcher::new();
    let id = dispatcher.register_encoder(encoder);

    let encoder = dispatcher.encoder_mut(id).unwrap();
    encoder.expander_mut().write(0x0F).unwrap();
    assert_eq!(bus.latch(ADDR), Some(0x0F));
    assert!(dispatcher.expander_mut(id).is_none());

    bus.set_pin(ADDR, PINS.a, false);
    dispatcher.ext_irq_handle();
    assert_eq!(dispatcher.encoder(id).map(RotaryEncoder::counter), Some(1));
}

#[test]
fn into_inner_returns_the_expander_with_its_snapshot() {
    let (bus, mut encoder) = encoder();
    step(&bus, &mut encoder, PINS.b, false);

    let expander = encoder.into_inner();
    assert_eq!(expander.address(), ADDR);
    assert_eq!(expander.last_value(), 0xFF);
    assert_eq!(expander.release().read_count(ADDR), bus.read_count(ADDR));
}
