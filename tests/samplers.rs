use lux_rs::core::prelude::*;
use lux_rs::samplers::*;

use std::collections::HashMap;
use std::sync::Arc;

fn make_layout() -> Arc<SampleLayout> {
    let mut layout = SampleLayout::new();
    layout.add_1d(2);
    layout.add_1d(1);
    layout.add_2d(1);
    layout.add_2d(2);
    layout.add_lazy(3, 2);
    return layout.freeze();
}

fn make_sampler(name: &str, params: &ParamSet, bounds: Bounds2i) -> (Sampler, Arc<Film>) {
    let layout = make_layout();
    let film = Arc::new(Film::new(&bounds));
    let sampler = create_sampler(name, params, &layout, &film).unwrap();
    return (sampler, film);
}

/// Every coordinate and stream value the sampler emits for `n` calls.
fn collect_stream(sampler: &Sampler, seed: u64, n: usize) -> Vec<Float> {
    let mut sample = sampler.init_sample(seed);
    let mut out = Vec::new();
    for _ in 0..n {
        assert!(sampler.get_next_sample(&mut sample));
        out.push(sample.image_x);
        out.push(sample.image_y);
        out.push(sample.lens_u);
        out.push(sample.lens_v);
        out.push(sample.time);
        out.push(sample.wavelengths);
        out.push(sampler.get_1d(&sample, 0, 0));
        out.push(sampler.get_1d(&sample, 0, 1));
        let p = sampler.get_2d(&sample, 1, 1);
        out.push(p.x);
        out.push(p.y);
        let lazy = sampler.get_lazy_values(&mut sample, 0, 1).to_vec();
        out.extend_from_slice(&lazy);
    }
    return out;
}

#[test]
fn unknown_sampler_name_is_an_error() {
    let layout = make_layout();
    let film = Arc::new(Film::new(&Bounds2i::from(((0, 0), (4, 4)))));
    assert!(create_sampler("halton", &ParamSet::new(), &layout, &film).is_err());
}

#[test]
fn lowdiscrepancy_sampler_is_deterministic() {
    let bounds = Bounds2i::from(((0, 0), (8, 8)));
    let mut params = ParamSet::new();
    params.add_int("pixelsamples", 8);
    params.add_string("pixelsampler", "linear");
    let (a, _) = make_sampler("lowdiscrepancy", &params, bounds);
    let (b, _) = make_sampler("lowdiscrepancy", &params, bounds);
    assert_eq!(collect_stream(&a, 42, 200), collect_stream(&b, 42, 200));
}

#[test]
fn sobol_sampler_is_deterministic() {
    let bounds = Bounds2i::from(((0, 0), (8, 8)));
    let params = ParamSet::new();
    let (a, _) = make_sampler("sobol", &params, bounds);
    let (b, _) = make_sampler("sobol", &params, bounds);
    assert_eq!(collect_stream(&a, 42, 200), collect_stream(&b, 42, 200));
}

#[test]
fn lowdiscrepancy_batch_rounds_up_to_power_of_two() {
    let bounds = Bounds2i::from(((0, 0), (4, 3)));
    let mut params = ParamSet::new();
    params.add_int("pixelsamples", 5);
    let (sampler, _) = make_sampler("lowdiscrepancy", &params, bounds);
    let Sampler::LowDiscrepancy(ld) = &sampler else {
        panic!("wrong variant");
    };
    assert_eq!(ld.pixel_samples(), 8);
}

#[test]
fn lowdiscrepancy_visits_every_pixel_once_per_pass() {
    let bounds = Bounds2i::from(((0, 0), (4, 3)));
    let batch = 4;
    let mut params = ParamSet::new();
    params.add_int("pixelsamples", batch as i32);
    params.add_string("pixelsampler", "linear");
    let (sampler, _) = make_sampler("lowdiscrepancy", &params, bounds);
    let mut sample = sampler.init_sample(9);
    let area = bounds.area() as usize;
    let mut visits: HashMap<(i32, i32), usize> = HashMap::new();
    for _ in 0..(area * batch) {
        assert!(sampler.get_next_sample(&mut sample));
        let key = (
            sample.image_x.floor() as i32,
            sample.image_y.floor() as i32,
        );
        *visits.entry(key).or_insert(0) += 1;
    }
    // One full pass: every pixel got exactly one batch of samples.
    assert_eq!(visits.len(), area);
    for count in visits.values() {
        assert_eq!(*count, batch);
    }
}

#[test]
fn lowdiscrepancy_stops_after_pass_when_film_has_enough() {
    let bounds = Bounds2i::from(((0, 0), (4, 3)));
    let batch = 4;
    let mut params = ParamSet::new();
    params.add_int("pixelsamples", batch as i32);
    params.add_string("pixelsampler", "linear");
    let (sampler, film) = make_sampler("lowdiscrepancy", &params, bounds);
    film.set_enough_samples(true);
    let mut sample = sampler.init_sample(1);
    let mut count = 0;
    while sampler.get_next_sample(&mut sample) {
        count += 1;
        assert!(count < 10000);
    }
    assert_eq!(count, bounds.area() as usize * batch);
}

#[test]
fn sobol_and_metropolis_stop_on_enough_samples() {
    let bounds = Bounds2i::from(((0, 0), (4, 4)));
    for name in ["sobol", "metropolis"] {
        let (sampler, film) = make_sampler(name, &ParamSet::new(), bounds);
        let mut sample = sampler.init_sample(1);
        assert!(sampler.get_next_sample(&mut sample));
        film.set_enough_samples(true);
        assert!(!sampler.get_next_sample(&mut sample));
    }
}

fn check_ranges(sampler: &Sampler, seed: u64, n: usize, bounds: &Bounds2f) {
    let mut sample = sampler.init_sample(seed);
    for _ in 0..n {
        assert!(sampler.get_next_sample(&mut sample));
        assert!(sample.image_x >= bounds.min.x && sample.image_x < bounds.max.x);
        assert!(sample.image_y >= bounds.min.y && sample.image_y < bounds.max.y);
        for v in [
            sample.lens_u,
            sample.lens_v,
            sample.time,
            sample.wavelengths,
            sampler.get_1d(&sample, 1, 0),
        ] {
            assert!((0.0..1.0).contains(&v), "value {} outside [0, 1)", v);
        }
        let p = sampler.get_2d(&sample, 0, 0);
        assert!((0.0..1.0).contains(&p.x));
        assert!((0.0..1.0).contains(&p.y));
        let lazy = sampler.get_lazy_values(&mut sample, 0, 0).to_vec();
        for v in lazy {
            assert!((0.0..1.0).contains(&v));
        }
        if sampler.is_mutating() {
            sampler.add_sample(&mut sample);
        }
    }
}

#[test]
fn emitted_coordinates_stay_in_domain() {
    // An offset rectangle catches scaling mistakes that a zero-based
    // one would hide.
    let bounds = Bounds2i::from(((3, 2), (10, 7)));
    let mut params = ParamSet::new();
    params.add_int("pixelsamples", 16);
    params.add_string("pixelsampler", "tile");
    let (ld, _) = make_sampler("lowdiscrepancy", &params, bounds);
    check_ranges(&ld, 5, 40000, &bounds.to_float());
    let (sobol, _) = make_sampler("sobol", &params, bounds);
    check_ranges(&sobol, 6, 30000, &bounds.to_float());
    let mut mparams = ParamSet::new();
    mparams.add_float("mutationrange", 2.5);
    let (metropolis, _) = make_sampler("metropolis", &mparams, bounds);
    check_ranges(&metropolis, 7, 30000, &bounds.to_float());
}

/// Kelemen-style estimator check: for a luminance L(x) = x over a
/// [0, 2) x [0, 1) film, flushed contribution mass must split 1:3
/// between the two pixels, and per-proposal mass must stay near the
/// pixel integrals over the primary domain (0.25 and 0.75).
fn run_unbiasedness(large_prob: Float, n: usize, tolerance: Float) {
    let bounds = Bounds2i::from(((0, 0), (2, 1)));
    let layout = make_layout();
    let film = Arc::new(Film::new(&bounds));
    let mut params = ParamSet::new();
    params.add_float("largemutationprob", large_prob);
    params.add_bool("usecooldown", false);
    params.add_int("maxconsecrejects", 128);
    let sampler = create_sampler("metropolis", &params, &layout, &film).unwrap();
    let mut sample = sampler.init_sample(1234);
    for _ in 0..n {
        assert!(sampler.get_next_sample(&mut sample));
        let l = sample.image_x;
        sample.add_contribution(Contribution::new(
            sample.image_x,
            sample.image_y,
            RGBColor::new(l, l, l),
        ));
        sampler.add_sample(&mut sample);
    }
    let p0 = film.pixel(0, 0).c[1] as f64 / n as f64;
    let p1 = film.pixel(1, 0).c[1] as f64 / n as f64;
    assert!(
        (p0 - 0.25).abs() < tolerance as f64,
        "pixel 0 mass {} (large prob {})",
        p0,
        large_prob
    );
    assert!(
        (p1 - 0.75).abs() < tolerance as f64,
        "pixel 1 mass {} (large prob {})",
        p1,
        large_prob
    );
}

#[test]
fn metropolis_is_unbiased_with_independent_proposals() {
    run_unbiasedness(1.0, 200000, 0.03);
}

#[test]
fn metropolis_is_unbiased_with_mostly_small_mutations() {
    run_unbiasedness(0.1, 300000, 0.04);
}

#[test]
fn samplers_switch_to_user_map_and_stick() {
    let bounds = Bounds2i::from(((0, 0), (8, 8)));
    for name in ["lowdiscrepancy", "sobol"] {
        let mut params = ParamSet::new();
        params.add_int("pixelsamples", 4);
        let (sampler, film) = make_sampler(name, &params, bounds);
        // All map mass in pixel (2, 3).
        let mut func = vec![0.0 as Float; 64];
        func[3 * 8 + 2] = 1.0;
        film.set_user_sampling_map(&func, 8, 8).unwrap();
        let mut sample = sampler.init_sample(3);
        for _ in 0..64 {
            assert!(sampler.get_next_sample(&mut sample));
            assert_eq!(
                (sample.image_x.floor() as i32, sample.image_y.floor() as i32),
                (2, 3),
                "sampler {} ignored the map",
                name
            );
        }
    }
}

#[test]
fn metropolis_large_steps_follow_user_map() {
    let bounds = Bounds2i::from(((0, 0), (8, 8)));
    let layout = make_layout();
    let film = Arc::new(Film::new(&bounds));
    let mut func = vec![0.0 as Float; 64];
    func[5 * 8 + 6] = 1.0;
    film.set_user_sampling_map(&func, 8, 8).unwrap();
    let mut params = ParamSet::new();
    params.add_float("largemutationprob", 1.0);
    params.add_bool("usecooldown", false);
    let sampler = create_sampler("metropolis", &params, &layout, &film).unwrap();
    let mut sample = sampler.init_sample(8);
    for _ in 0..64 {
        assert!(sampler.get_next_sample(&mut sample));
        assert_eq!(
            (sample.image_x.floor() as i32, sample.image_y.floor() as i32),
            (6, 5)
        );
        sampler.add_sample(&mut sample);
    }
}
