//! Synthetic VASP output used by the tests and benchmarks
//!
//! [`OutcarFixture`] holds the handful of quantities the readers care about and renders them
//! in the layout VASP writes, so parsers can be exercised without shipping real output files.

pub mod structures;

use std::fmt::Write;

/// One species in a fixture cell
#[derive(Clone, Debug)]
pub struct Species {
    pub name: String,
    pub count: usize,
    pub valence: f64,
}

/// Exchange-correlation settings written to the fixture
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FixtureFunctional {
    Gga,
    Hse,
    G0W0,
}

#[derive(Clone, Debug)]
pub struct OutcarFixture {
    pub functional: FixtureFunctional,
    pub species: Vec<Species>,
    pub electrons: f64,
    pub lattice: [[f64; 3]; 3],
    pub positions: Vec<[f64; 3]>,
    pub energy: f64,
    pub iterations: usize,
    pub fermi_energy: f64,
    pub ispin: usize,
    pub icharg: i32,
    pub ismear: i32,
    pub lorbit: i32,
    pub nedos: usize,
    pub emin: f64,
    pub emax: f64,
    /// Fractional coordinates and weight of each k-point
    pub kpoints: Vec<([f64; 3], f64)>,
    /// One block of `(energy, occupation)` per k-point, repeated per spin channel
    pub bands: Vec<Vec<(f64, f64)>>,
    pub potentials: Vec<f64>,
    pub orbitals: Vec<String>,
}

impl OutcarFixture {
    /// A cubic cell of side `side` with the ions of `species` placed on a regular grid
    pub fn cubic(species: &[(&str, usize, f64)], side: f64) -> Self {
        let total = species.iter().map(|(_, count, _)| count).sum::<usize>();
        let per_side = (1..).find(|n: &usize| n.pow(3) >= total).unwrap_or(1);
        let spacing = side / per_side as f64;
        let positions = (0..total)
            .map(|index| {
                let (i, j, k) = (
                    index / (per_side * per_side),
                    (index / per_side) % per_side,
                    index % per_side,
                );
                [
                    i as f64 * spacing,
                    j as f64 * spacing,
                    k as f64 * spacing,
                ]
            })
            .collect();
        let species = species
            .iter()
            .map(|(name, count, valence)| Species {
                name: name.to_string(),
                count: *count,
                valence: *valence,
            })
            .collect::<Vec<_>>();
        let electrons = species
            .iter()
            .map(|species| species.count as f64 * species.valence)
            .sum();
        Self {
            functional: FixtureFunctional::Gga,
            species,
            electrons,
            lattice: [[side, 0., 0.], [0., side, 0.], [0., 0., side]],
            positions,
            energy: -100.,
            iterations: 3,
            fermi_energy: 1.0,
            ispin: 1,
            icharg: 2,
            ismear: 0,
            lorbit: 11,
            nedos: 5,
            emin: 10.,
            emax: -10.,
            kpoints: vec![([0., 0., 0.], 0.25), ([0.5, 0., 0.], 0.75)],
            bands: vec![
                vec![(-6.0, 2.), (0.5, 2.), (2.5, 0.), (4.0, 0.)],
                vec![(-5.5, 2.), (1.0, 2.), (2.2, 0.), (3.5, 0.)],
            ],
            potentials: (0..total).map(|index| -40. - index as f64).collect(),
            orbitals: vec!["s".into(), "p".into(), "d".into()],
        }
    }

    pub fn total_atoms(&self) -> usize {
        self.species.iter().map(|species| species.count).sum()
    }

    /// Flat index of the `index`-th (1-based) ion of `name`
    pub fn flat_index(&self, name: &str, index: usize) -> usize {
        let mut offset = 0;
        for species in &self.species {
            if species.name == name {
                return offset + index - 1;
            }
            offset += species.count;
        }
        panic!("Species {} is not in the fixture", name)
    }

    /// Removes an ion along with its position and potential, keeping the electron count
    pub fn without_atom(mut self, name: &str, index: usize) -> Self {
        let flat = self.flat_index(name, index);
        self.positions.remove(flat);
        self.potentials.remove(flat);
        let species = self
            .species
            .iter_mut()
            .find(|species| species.name == name)
            .unwrap();
        species.count -= 1;
        self.electrons -= species.valence;
        self.species.retain(|species| species.count > 0);
        self
    }

    /// Appends an ion at `position`, adding its valence electrons
    pub fn with_atom(mut self, name: &str, valence: f64, position: [f64; 3], potential: f64) -> Self {
        let insert_at = match self.species.iter().position(|species| species.name == name) {
            Some(at) => {
                let offset = self.species[..=at].iter().map(|s| s.count).sum::<usize>();
                self.species[at].count += 1;
                offset
            }
            None => {
                self.species.push(Species {
                    name: name.to_string(),
                    count: 1,
                    valence,
                });
                self.total_atoms() - 1
            }
        };
        self.positions.insert(insert_at, position);
        self.potentials.insert(insert_at, potential);
        self.electrons += valence;
        self
    }

    /// Removes `charge` electrons, so the cell carries that net charge
    pub fn with_charge(mut self, charge: f64) -> Self {
        self.electrons -= charge;
        self
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_potential_shift(mut self, shift: f64) -> Self {
        self.potentials.iter_mut().for_each(|potential| *potential += shift);
        self
    }

    pub fn with_functional(mut self, functional: FixtureFunctional) -> Self {
        self.functional = functional;
        self
    }

    /// Replaces the band blocks with a two band valence / conduction pair at every k-point
    pub fn with_band_edges(mut self, vbm: f64, cbm: f64) -> Self {
        let occupation = if self.ispin == 2 { 1. } else { 2. };
        let blocks = self
            .kpoints
            .iter()
            .enumerate()
            .map(|(index, _)| {
                let dispersion = index as f64 * 0.1;
                vec![
                    (vbm - 5. - dispersion, occupation),
                    (vbm - dispersion, occupation),
                    (cbm + dispersion, 0.),
                    (cbm + 2. + dispersion, 0.),
                ]
            })
            .collect::<Vec<_>>();
        self.bands = std::iter::repeat(blocks)
            .take(self.ispin)
            .flatten()
            .collect();
        self
    }

    pub fn spin_polarised(mut self) -> Self {
        self.ispin = 2;
        let blocks = self
            .bands
            .iter()
            .map(|block| {
                block
                    .iter()
                    .map(|(energy, occupation)| (*energy, occupation / 2.))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let mut bands = blocks.clone();
        bands.extend(blocks);
        self.bands = bands;
        self
    }

    /// A band structure run along `points` k-points
    pub fn band_structure(mut self, points: usize) -> Self {
        self.icharg = 11;
        self.kpoints = (0..points)
            .map(|index| ([0.5 * index as f64 / (points - 1) as f64, 0., 0.], 0.))
            .collect();
        let blocks = (0..points)
            .map(|index| {
                let x = index as f64 / (points - 1) as f64;
                vec![(-1. - x, 2.), (-x * x, 2.), (1. + x, 0.), (3. - x, 0.)]
            })
            .collect::<Vec<_>>();
        self.bands = blocks;
        self
    }

    fn functional_tags(&self) -> (&'static str, &'static str, Option<&'static str>) {
        match self.functional {
            FixtureFunctional::Gga => ("8", "F", None),
            FixtureFunctional::Hse => ("8", "T", Some("0.2000")),
            FixtureFunctional::G0W0 => ("8", "F", None),
        }
    }

    /// The OUTCAR text
    pub fn render(&self) -> String {
        let mut out = String::new();
        let (lexch, lhfcalc, hfscreen) = self.functional_tags();
        let gw = self.functional == FixtureFunctional::G0W0;

        writeln!(out, " vasp.5.4.4.18Apr17-6-g9f103f2a35 (build Mar 21 2019) complex").unwrap();
        writeln!(out).unwrap();
        for species in &self.species {
            writeln!(out, "   VRHFIN ={}: s p d", species.name).unwrap();
            writeln!(
                out,
                "   POMASS =  100.00; ZVAL   =   {:.2}    mass and valenz",
                species.valence
            )
            .unwrap();
        }
        writeln!(
            out,
            "   ions per type =  {}",
            self.species
                .iter()
                .map(|species| format!("{:>4}", species.count))
                .collect::<String>()
        )
        .unwrap();
        writeln!(
            out,
            "   k-points           NKPTS = {:>6}   k-points in BZ     NKDIM = {:>6}   number of bands    NBANDS= {:>6}",
            self.kpoints.len(),
            self.kpoints.len(),
            self.bands.first().map(Vec::len).unwrap_or(0)
        )
        .unwrap();
        writeln!(
            out,
            "   number of dos      NEDOS = {:>6}   number of ions     NIONS = {:>6}",
            self.nedos,
            self.total_atoms()
        )
        .unwrap();
        writeln!(out).unwrap();
        writeln!(out, "   ENCUT  =  400.0 eV  29.40 Ry    5.42 a.u.").unwrap();
        writeln!(out, "   ISTART =      0    job   : 0-new  1-cont  2-samecut").unwrap();
        writeln!(out, "   ICHARG = {:>6}    charge: 1-file 2-atom 10-const", self.icharg).unwrap();
        writeln!(out, "   ISPIN  = {:>6}    spin polarized calculation?", self.ispin).unwrap();
        writeln!(out, "   NELM    = {:>6}    number of ELM steps", if gw { 1 } else { 60 }).unwrap();
        writeln!(out, "   EDIFF  = 0.1E-05   stopping-criterion for ELM").unwrap();
        writeln!(out, "   ISYM   =      2    0-nonsym 1-usesym 2-fastsym").unwrap();
        writeln!(
            out,
            "   NELECT = {:>12.4}    total number of electrons",
            self.electrons
        )
        .unwrap();
        writeln!(
            out,
            "   EMIN   = {:>7.2};   EMAX   = {:>7.2}  energy-range for DOS",
            self.emin, self.emax
        )
        .unwrap();
        writeln!(
            out,
            "   ISMEAR = {:>5};   SIGMA  =   0.05  broadening in eV -4-tet -1-fermi 0-gaus",
            self.ismear
        )
        .unwrap();
        writeln!(out, "   LEXCH   = {:>5}    internal setting for exchange type", lexch).unwrap();
        writeln!(out, "   LHFCALC = {:>5}    Hartree Fock is set to", lhfcalc).unwrap();
        if let Some(screening) = hfscreen {
            writeln!(out, "   HFSCREEN= {}    screening length (either q_TF or 0.3 A-1)", screening)
                .unwrap();
        }
        writeln!(
            out,
            "   LORBIT = {:>6}    0 simple, 1 ext, 2 COOP (PROOUT), +10 PAW based schemes",
            self.lorbit
        )
        .unwrap();
        writeln!(out).unwrap();
        writeln!(
            out,
            "  ZVAL   = {}",
            self.species
                .iter()
                .map(|species| format!("{:>7.2}", species.valence))
                .collect::<String>()
        )
        .unwrap();
        writeln!(out).unwrap();

        writeln!(out, " position of ions in cartesian coordinates  (Angst):").unwrap();
        for position in &self.positions {
            writeln!(
                out,
                "  {:>12.8}{:>12.8}{:>12.8}",
                position[0], position[1], position[2]
            )
            .unwrap();
        }
        writeln!(out).unwrap();

        writeln!(out, " k-points in reciprocal lattice and weights: Automatic mesh").unwrap();
        for (coordinates, weight) in &self.kpoints {
            writeln!(
                out,
                "   {:>12.8}{:>12.8}{:>12.8}{:>14.6}",
                coordinates[0], coordinates[1], coordinates[2], weight
            )
            .unwrap();
        }
        writeln!(out).unwrap();
        writeln!(out, " k-points in units of 2pi/SCALE and weight: Automatic mesh").unwrap();
        for (coordinates, weight) in &self.kpoints {
            let scale = 1. / self.lattice[0][0];
            writeln!(
                out,
                "   {:>12.8}{:>12.8}{:>12.8}{:>14.6}",
                coordinates[0] * scale,
                coordinates[1] * scale,
                coordinates[2] * scale,
                weight
            )
            .unwrap();
        }
        writeln!(out).unwrap();

        writeln!(out, "      direct lattice vectors                 reciprocal lattice vectors").unwrap();
        for row in &self.lattice {
            writeln!(
                out,
                "    {:>12.9}{:>12.9}{:>12.9}     0.000000000  0.000000000  0.000000000",
                row[0], row[1], row[2]
            )
            .unwrap();
        }
        writeln!(out).unwrap();
        writeln!(out, " # of ion       {}       tot", self.orbitals.join("       ")).unwrap();
        writeln!(out).unwrap();

        if gw {
            let header = "  band No.  KS-energies  QP-energies   sigma(KS)   V_xc(KS)     V^pw_x(r,r')   Z            occupation";
            writeln!(out, " Response functions by sum over occupied states:").unwrap();
            writeln!(out, " Response functions by sum over occupied states:").unwrap();
            for block in &self.bands {
                writeln!(out, " k-point   1 :       0.0000    0.0000    0.0000").unwrap();
                writeln!(out, "{}", header).unwrap();
                writeln!(out).unwrap();
                for (band, (energy, occupation)) in block.iter().enumerate() {
                    writeln!(
                        out,
                        "   {:>5}   {:>10.4}   {:>10.4}   -1.0000   -1.0000   -1.0000   0.7000   {:>10.5}",
                        band + 1,
                        energy - 0.3,
                        energy,
                        occupation
                    )
                    .unwrap();
                }
                writeln!(out).unwrap();
            }
            writeln!(
                out,
                " E-fermi : {:>10.4}     XC(G=0):  -1.0000     alpha+bet : -1.0000",
                self.fermi_energy
            )
            .unwrap();
            writeln!(out, "  free energy    TOTEN  = {:>18.8} eV", self.energy).unwrap();
        } else {
            for iteration in 1..=self.iterations {
                writeln!(
                    out,
                    "----------------------------------------- Iteration    1({:>4})  ---------------------------------------",
                    iteration
                )
                .unwrap();
                writeln!(
                    out,
                    "  free energy    TOTEN  = {:>18.8} eV",
                    self.energy + 0.1 / iteration as f64 - 0.1 / self.iterations as f64
                )
                .unwrap();
                writeln!(out).unwrap();
            }
            writeln!(out, " average (electrostatic) potential at core").unwrap();
            writeln!(out, "  the test charge radii are     0.9757  1.3148").unwrap();
            writeln!(out, "  (the norm of the test charge is              1.0000)").unwrap();
            for chunk in self.potentials.chunks(5).enumerate() {
                let (row, values) = chunk;
                let line = values
                    .iter()
                    .enumerate()
                    .map(|(column, value)| format!("{:>7}{:>9.4}", row * 5 + column + 1, value))
                    .collect::<String>();
                writeln!(out, "{}", line).unwrap();
            }
            writeln!(out).unwrap();
            writeln!(
                out,
                " E-fermi : {:>10.4}     XC(G=0):  -1.0000     alpha+bet : -1.0000",
                self.fermi_energy
            )
            .unwrap();
            writeln!(out).unwrap();
            for (spin, blocks) in self.bands.chunks(self.kpoints.len().max(1)).enumerate() {
                if self.ispin == 2 {
                    writeln!(out, " spin component {}", spin + 1).unwrap();
                    writeln!(out).unwrap();
                }
                for (kpoint, block) in blocks.iter().enumerate() {
                    writeln!(
                        out,
                        " k-point {:>5} :       0.0000    0.0000    0.0000",
                        kpoint + 1
                    )
                    .unwrap();
                    writeln!(out, "  band No.  band energies     occupation ").unwrap();
                    for (band, (energy, occupation)) in block.iter().enumerate() {
                        writeln!(
                            out,
                            "     {:>3}     {:>10.4}     {:>10.5}",
                            band + 1,
                            energy,
                            occupation
                        )
                        .unwrap();
                    }
                    writeln!(out).unwrap();
                }
            }
        }
        out
    }

    /// A DOSCAR consistent with this fixture
    ///
    /// The total DOS rises linearly with the energy index. Projected entries are one per
    /// orbital component and spin channel, with the value `0.01 * (atom + 1)`.
    pub fn render_doscar(&self) -> String {
        let mut out = String::new();
        let atoms = self.total_atoms();
        writeln!(out, "{:>4}{:>4}  1  0", atoms, atoms).unwrap();
        writeln!(out, "  0.1000000E+02  0.3000000E-09  0.3000000E-09  0.3000000E-09  0.5000000E-15").unwrap();
        writeln!(out, "  1.0000000000000000E-004").unwrap();
        writeln!(out, "  CAR ").unwrap();
        writeln!(out, " fixture").unwrap();
        let header = format!(
            "   {:>8.3}   {:>8.3}  {:>5}   {:>10.5}     1.00000000",
            self.emax.max(self.emin),
            self.emin.min(self.emax),
            self.nedos,
            self.fermi_energy
        );
        writeln!(out, "{}", header).unwrap();
        let low = self.emin.min(self.emax);
        let high = self.emin.max(self.emax);
        let step = (high - low) / (self.nedos - 1) as f64;
        for point in 0..self.nedos {
            let energy = low + point as f64 * step;
            let value = point as f64;
            if self.ispin == 2 {
                writeln!(
                    out,
                    "  {:>8.3}  {:.4E}  {:.4E}  {:.4E}  {:.4E}",
                    energy,
                    value,
                    2. * value,
                    value,
                    value
                )
                .unwrap();
            } else {
                writeln!(out, "  {:>8.3}  {:.4E}  {:.4E}", energy, value, value).unwrap();
            }
        }
        if self.lorbit == 11 {
            let components = match self.orbitals.len() {
                4 => 16,
                _ => 9,
            } * self.ispin;
            for atom in 0..atoms {
                writeln!(out, "{}", header).unwrap();
                for point in 0..self.nedos {
                    let energy = low + point as f64 * step;
                    let value = 0.01 * (atom + 1) as f64;
                    let row = std::iter::repeat(format!("  {:.4E}", value))
                        .take(components)
                        .collect::<String>();
                    writeln!(out, "  {:>8.3}{}", energy, row).unwrap();
                }
            }
        }
        out
    }
}
