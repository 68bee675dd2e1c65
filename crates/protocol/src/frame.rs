//! Frame-Datenmodell
//!
//! Ein Frame besteht aus `type` (wie der Body aufgebaut ist), `flag`
//! (Protokoll-Unterzustand, z.B. Handshake-Phase) und dem Body. Die Groesse
//! wird nicht separat gespeichert, sie ist immer `body.len()`.

use bytes::Bytes;

// ---------------------------------------------------------------------------
// DataType
// ---------------------------------------------------------------------------

/// Nutzdatentyp eines Frames (1 Byte auf dem Draht)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Text = 0,
    Number = 1,
    Audio = 2,
    File = 3,
    Voice = 4,
}

impl DataType {
    /// Gibt den Draht-Wert zurueck
    pub fn wert(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DataType {
    type Error = u8;

    fn try_from(wert: u8) -> Result<Self, Self::Error> {
        match wert {
            0 => Ok(Self::Text),
            1 => Ok(Self::Number),
            2 => Ok(Self::Audio),
            3 => Ok(Self::File),
            4 => Ok(Self::Voice),
            andere => Err(andere),
        }
    }
}

// ---------------------------------------------------------------------------
// Flag
// ---------------------------------------------------------------------------

/// Protokoll-Unterzustand eines Frames (4 Bytes auf dem Draht)
///
/// Offene Aufzaehlung: unbekannte Werte bleiben als `Unbekannt` erhalten,
/// damit ein Frame verlustfrei weitergereicht werden kann.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Normaler Befehl / Text ohne Handshake-Zustand
    Command,
    Channel,
    Nick,
    Id,
    DelChannel,
    NoChannel,
    LoginSignUp,
    PasswordSignUp,
    NickSignUp,
    LoginLogIn,
    PasswordLogIn,
    NickLogIn,
    CheckLogin,
    CheckPassword,
    CheckNickname,
    Registered,
    CheckId,
    IdCorrect,
    Authorized,
    ChangeNick,
    AudiofileError,
    TimeOn,
    TimeOff,
    FileError,
    Unbekannt(u32),
}

impl Flag {
    /// Gibt den Draht-Wert zurueck
    pub fn wert(self) -> u32 {
        match self {
            Self::Command => 0,
            Self::Channel => 1,
            Self::Nick => 2,
            Self::Id => 3,
            Self::DelChannel => 4,
            Self::NoChannel => 5,
            Self::LoginSignUp => 6,
            Self::PasswordSignUp => 7,
            Self::NickSignUp => 8,
            Self::LoginLogIn => 9,
            Self::PasswordLogIn => 10,
            Self::NickLogIn => 11,
            Self::CheckLogin => 12,
            Self::CheckPassword => 13,
            Self::CheckNickname => 14,
            Self::Registered => 15,
            Self::CheckId => 16,
            Self::IdCorrect => 17,
            Self::Authorized => 18,
            Self::ChangeNick => 19,
            Self::AudiofileError => 20,
            Self::TimeOn => 21,
            Self::TimeOff => 22,
            Self::FileError => 23,
            Self::Unbekannt(n) => n,
        }
    }
}

impl From<u32> for Flag {
    fn from(wert: u32) -> Self {
        match wert {
            0 => Self::Command,
            1 => Self::Channel,
            2 => Self::Nick,
            3 => Self::Id,
            4 => Self::DelChannel,
            5 => Self::NoChannel,
            6 => Self::LoginSignUp,
            7 => Self::PasswordSignUp,
            8 => Self::NickSignUp,
            9 => Self::LoginLogIn,
            10 => Self::PasswordLogIn,
            11 => Self::NickLogIn,
            12 => Self::CheckLogin,
            13 => Self::CheckPassword,
            14 => Self::CheckNickname,
            15 => Self::Registered,
            16 => Self::CheckId,
            17 => Self::IdCorrect,
            18 => Self::Authorized,
            19 => Self::ChangeNick,
            20 => Self::AudiofileError,
            21 => Self::TimeOn,
            22 => Self::TimeOff,
            23 => Self::FileError,
            n => Self::Unbekannt(n),
        }
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Ein laengen-begrenzter Protokoll-Frame (Header + Body)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub typ: DataType,
    pub flag: Flag,
    pub body: Bytes,
}

impl Frame {
    /// Erstellt einen Frame mit beliebigem Body
    pub fn neu(typ: DataType, flag: Flag, body: impl Into<Bytes>) -> Self {
        Self {
            typ,
            flag,
            body: body.into(),
        }
    }

    /// Erstellt einen TEXT-Frame
    pub fn text(flag: Flag, text: impl Into<String>) -> Self {
        Self::neu(DataType::Text, flag, text.into().into_bytes())
    }

    /// Erstellt einen Frame ohne Body (reine Flag-Meldung)
    pub fn leer(typ: DataType, flag: Flag) -> Self {
        Self::neu(typ, flag, Bytes::new())
    }

    /// Deklarierte Body-Groesse, wie sie im Header steht
    pub fn groesse(&self) -> usize {
        self.body.len()
    }

    /// Interpretiert den Body als UTF-8-Text (ungueltige Sequenzen werden ersetzt)
    pub fn text_inhalt(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_werte_sind_stabil() {
        for wert in 0..=23u32 {
            let flag = Flag::from(wert);
            assert!(!matches!(flag, Flag::Unbekannt(_)), "Wert {wert} muss bekannt sein");
            assert_eq!(flag.wert(), wert);
        }
        assert_eq!(Flag::from(99), Flag::Unbekannt(99));
        assert_eq!(Flag::Unbekannt(99).wert(), 99);
        assert_eq!(Flag::Registered.wert(), 15);
        assert_eq!(Flag::FileError.wert(), 23);
    }

    #[test]
    fn data_type_unbekannt() {
        assert_eq!(DataType::try_from(4), Ok(DataType::Voice));
        assert_eq!(DataType::try_from(5), Err(5));
    }

    #[test]
    fn text_frame_groesse() {
        let f = Frame::text(Flag::Command, "/join general");
        assert_eq!(f.typ, DataType::Text);
        assert_eq!(f.groesse(), 13);
        assert_eq!(f.text_inhalt(), "/join general");
    }
}
