//! Lookup tables for the PSG core
//!
//! DAC curves, envelope shape segments and the half-band decimation kernel.

use super::generators::EnvelopeAction::{self, HoldBottom, HoldTop, SlideDown, SlideUp};

/// Oversampling steps folded into one output sample
pub(crate) const DECIMATE_FACTOR: usize = 8;

/// Decimation filter length in taps
pub(crate) const FIR_SIZE: usize = 192;

/// AY-3-8910 output levels. The chip has 16 volume steps; each is repeated
/// so envelope and fixed volumes share one 32-entry index space.
#[rustfmt::skip]
pub(crate) const AY_DAC_TABLE: [f64; 32] = [
    0.0, 0.0,
    0.00999465934234, 0.00999465934234,
    0.0144502937362, 0.0144502937362,
    0.0210574502174, 0.0210574502174,
    0.0307011520562, 0.0307011520562,
    0.0455481803616, 0.0455481803616,
    0.0644998855573, 0.0644998855573,
    0.107362478065, 0.107362478065,
    0.126588845655, 0.126588845655,
    0.20498970016, 0.20498970016,
    0.292210269322, 0.292210269322,
    0.372838941024, 0.372838941024,
    0.492530708782, 0.492530708782,
    0.635324635691, 0.635324635691,
    0.805584802014, 0.805584802014,
    1.0, 1.0,
];

/// YM2149 output levels (32 distinct steps)
#[rustfmt::skip]
#[allow(clippy::excessive_precision)]
pub(crate) const YM_DAC_TABLE: [f64; 32] = [
    0.0, 0.0,
    0.00465400167849, 0.00772106507973,
    0.0109559777218, 0.0139620050355,
    0.0169985503929, 0.0200198367285,
    0.024368657969, 0.029694056611,
    0.0350652323186, 0.0403906309606,
    0.0485389486534, 0.0583352407111,
    0.0680552376593, 0.0777752346075,
    0.0925154497597, 0.111085679408,
    0.129747463188, 0.148485542077,
    0.17666895552, 0.211551079576,
    0.246387426566, 0.281101701381,
    0.333730067903, 0.400427252613,
    0.467383840696, 0.53443198291,
    0.635172045472, 0.75800717174,
    0.879926756695, 1.0,
];

/// Two segments per envelope shape (R13 & 0x0f)
pub(crate) const ENVELOPE_SHAPES: [[EnvelopeAction; 2]; 16] = [
    [SlideDown, HoldBottom],
    [SlideDown, HoldBottom],
    [SlideDown, HoldBottom],
    [SlideDown, HoldBottom],
    [SlideUp, HoldBottom],
    [SlideUp, HoldBottom],
    [SlideUp, HoldBottom],
    [SlideUp, HoldBottom],
    [SlideDown, SlideDown],
    [SlideDown, HoldBottom],
    [SlideDown, SlideUp],
    [SlideDown, HoldTop],
    [SlideUp, SlideUp],
    [SlideUp, HoldTop],
    [SlideUp, SlideDown],
    [SlideUp, HoldBottom],
];

/// Center tap of the decimation kernel
pub(crate) const FIR_CENTER: f64 = 0.125;

/// Symmetric half of the decimation kernel.
///
/// Tap `k` weighs `x[k] + x[FIR_SIZE - k]`; index 0 is unused and every
/// eighth tap is zero.
#[rustfmt::skip]
#[allow(clippy::excessive_precision, clippy::unreadable_literal)]
pub(crate) const FIR_KERNEL: [f64; 96] = [
    0.0, -0.0000046183113992051936, -0.00001117761640887225, -0.000018610264502005432,
    -0.000025134586135631012, -0.000028494281690666197, -0.000026396828793275159, -0.000017094212558802156,
    0.0, 0.000023798193576966866, 0.000051281160242202183, 0.00007762197826243427,
    0.000096759426664120416, 0.00010240229300393402, 0.000089344614218077106, 0.000054875700118949183,
    0.0, -0.000069839082210680165, -0.0001447966132360757, -0.00021158452917708308,
    -0.00025535069106550544, -0.00026228714374322104, -0.00022258805927027799, -0.00013323230495695704,
    0.0, 0.00016182578767055206, 0.00032846175385096581, 0.00047045611576184863,
    0.00055713851457530944, 0.00056212565121518726, 0.00046901918553962478, 0.00027624866838952986,
    0.0, -0.00032564179486838622, -0.00065182310286710388, -0.00092127787309319298,
    -0.0010772534348943575, -0.0010737727700273478, -0.00088556645390392634, -0.00051581896090765534,
    0.0, 0.00059548767193795277, 0.0011803558710661009, 0.0016527320270369871,
    0.0019152679330965555, 0.0018927324805381538, 0.0015481870327877937, 0.00089470695834941306,
    0.0, -0.0010178225878206125, -0.0020037400552054292, -0.0027874356824117317,
    -0.003210329988021943, -0.0031540624117984395, -0.0025657163651900345, -0.0014750752642111449,
    0.0, 0.0016624165446378462, 0.0032591192839069179, 0.0045165685815867747,
    0.0051838984346123896, 0.0050774264697459933, 0.0041192521414141585, 0.0023628575417966491,
    0.0, -0.0026543507866759182, -0.0051990251084333425, -0.0072020238234656924,
    -0.0082672928192007358, -0.0081033739572956287, -0.006583111539570221, -0.0037839040415292386,
    0.0, 0.0042781252851152507, 0.0084176358598320178, 0.01172566057463055,
    0.013550476647788672, 0.013388189369997496, 0.010979501242341259, 0.006381274941685413,
    0.0, -0.007421229604153888, -0.01486456304340213, -0.021143584622178104,
    -0.02504275058758609, -0.025473530942547201, -0.021627310017882196, -0.013104323383225543,
    0.0, 0.017065133989980476, 0.036978919264451952, 0.05823318062093958,
    0.079072012081405949, 0.097675998716952317, 0.11236045936950932, 0.12176343577287731,
];
