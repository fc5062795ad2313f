use manifold_core::{
    EvolutionDriver, GridSpec, ImexStepper, ImprintSource, ManifoldError, ParameterSet,
};
use ndarray::{ArrayD, IxDyn};
use wasm_bindgen::prelude::*;

fn js_err(e: ManifoldError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Square 2D manifold solver for interactive use.
#[wasm_bindgen]
pub struct Manifold {
    n: usize,
    inner: EvolutionDriver,
    imprint: ImprintSource,
}

#[wasm_bindgen]
impl Manifold {
    #[wasm_bindgen(constructor)]
    pub fn new(n: usize, seed: u64) -> Result<Manifold, JsValue> {
        let grid = GridSpec::square(n).map_err(js_err)?;
        let stepper = ImexStepper::new(grid, ParameterSet::default(), seed).map_err(js_err)?;
        Ok(Manifold {
            n,
            inner: EvolutionDriver::new(stepper),
            imprint: ImprintSource::Zero,
        })
    }

    // Parameters
    pub fn set_tau_m(&mut self, v: f64) -> Result<(), JsValue> { self.update(|p| p.tau_m = v) }
    pub fn set_xi_squared(&mut self, v: f64) -> Result<(), JsValue> { self.update(|p| p.xi_squared = v) }
    pub fn set_mu_squared(&mut self, v: f64) -> Result<(), JsValue> { self.update(|p| p.mu_squared = v) }
    pub fn set_beta(&mut self, v: f64) -> Result<(), JsValue> { self.update(|p| p.beta = v) }
    pub fn set_kappa(&mut self, v: f64) -> Result<(), JsValue> { self.update(|p| p.kappa = v) }
    pub fn set_noise_amplitude(&mut self, v: f64) -> Result<(), JsValue> { self.update(|p| p.noise_amplitude = v) }
    pub fn set_dt(&mut self, v: f64) -> Result<(), JsValue> { self.update(|p| p.dt = v) }
    pub fn set_clip_value(&mut self, v: f64) -> Result<(), JsValue> { self.update(|p| p.clip_value = v) }

    pub fn get_dt(&self) -> f64 { self.inner.stepper().params().dt }
    pub fn amplified_modes(&self) -> usize { self.inner.stepper().operator().amplified_modes() }

    pub fn n(&self) -> usize { self.n }
    pub fn time(&self) -> f64 { self.inner.time() }
    pub fn step_count(&self) -> u64 { self.inner.step_count() }

    /// Zero field, t = 0.
    pub fn clear(&mut self) -> Result<(), JsValue> {
        self.inner.reset(None).map_err(js_err)
    }

    /// Row-major n*n initial field.
    pub fn set_field(&mut self, values: Vec<f64>) -> Result<(), JsValue> {
        let field = self.to_grid(values)?;
        self.inner.reset(Some(field)).map_err(js_err)
    }

    /// Row-major n*n constant imprint used by subsequent steps.
    pub fn set_imprint(&mut self, values: Vec<f64>) -> Result<(), JsValue> {
        self.imprint = ImprintSource::constant(self.to_grid(values)?);
        Ok(())
    }

    pub fn clear_imprint(&mut self) {
        self.imprint = ImprintSource::Zero;
    }

    // Copy-based JS access (reliable)
    pub fn get_field(&self) -> Vec<f64> {
        self.inner.field().iter().copied().collect()
    }

    // Step + timing (WASM-only)
    pub fn step(&mut self, steps: usize) -> Result<StepInfo, JsValue> {
        let t0 = now_ms();
        self.inner.evolve(steps, &mut self.imprint).map_err(js_err)?;
        let t1 = now_ms();
        let stats = self.inner.stats();
        Ok(StepInfo {
            steps,
            compute_ms: t1 - t0,
            time: self.inner.time(),
            max_abs: stats.max_abs,
            energy: stats.energy,
        })
    }

    /// Radial power spectrum as [k_0, p_0, k_1, p_1, ...].
    pub fn power_spectrum(&mut self) -> Vec<f64> {
        let spectrum = self.inner.power_spectrum();
        spectrum
            .k
            .iter()
            .zip(spectrum.power.iter())
            .flat_map(|(&k, &p)| [k, p])
            .collect()
    }
}

impl Manifold {
    fn update(&mut self, edit: impl FnOnce(&mut ParameterSet)) -> Result<(), JsValue> {
        let mut params = *self.inner.stepper().params();
        edit(&mut params);
        self.inner.stepper_mut().reconfigure(params).map_err(js_err)
    }

    fn to_grid(&self, values: Vec<f64>) -> Result<ArrayD<f64>, JsValue> {
        let found = values.len();
        ArrayD::from_shape_vec(IxDyn(&[self.n, self.n]), values).map_err(|_| {
            js_err(ManifoldError::ShapeMismatch {
                what: "row-major input",
                expected: vec![self.n, self.n],
                found: vec![found],
            })
        })
    }
}

#[wasm_bindgen]
pub struct StepInfo {
    steps: usize,
    compute_ms: f64,
    time: f64,
    max_abs: f64,
    energy: f64,
}

#[wasm_bindgen]
impl StepInfo {
    pub fn steps(&self) -> usize { self.steps }
    pub fn compute_ms(&self) -> f64 { self.compute_ms }
    pub fn time(&self) -> f64 { self.time }
    pub fn max_abs(&self) -> f64 { self.max_abs }
    pub fn energy(&self) -> f64 { self.energy }
}


fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
